//! Cross-entropy and perplexity objectives over recorded outputs.

use super::dataset::DataSet;
use crate::error::Result;
use crate::graph::Graph;

/// Summed objectives of one sequence.
#[derive(Debug, Clone)]
pub struct Loss<N> {
    /// Sum of `-ln p(expected)` over all steps
    pub cross_entropy: N,
    /// Sum of `-log2 p(expected)` over all steps
    pub perplexity: N,
}

/// Fold the per-step losses of every recorded output, left to right.
///
/// Returns `None` when nothing was recorded. Any step without an expected
/// index aborts the whole accumulation.
pub fn accumulate<G, D>(graph: &G, data: &D) -> Result<Option<Loss<G::Node>>>
where
    G: Graph,
    D: DataSet<G> + ?Sized,
{
    let mut total: Option<Loss<G::Node>> = None;

    for (step, probs) in data.computed_vectors().iter().enumerate() {
        let expected = data.expected_value(step)?;

        let nll = graph.neg(&graph.log(probs)?)?;
        let loss = graph.slice(&nll, expected)?;
        let nll2 = graph.neg(&graph.log2(probs)?)?;
        let perp = graph.slice(&nll2, expected)?;

        total = Some(match total {
            None => Loss {
                cross_entropy: loss,
                perplexity: perp,
            },
            Some(acc) => Loss {
                cross_entropy: graph.add(&acc.cross_entropy, &loss)?,
                perplexity: graph.add(&acc.perplexity, &perp)?,
            },
        });
    }

    if total.is_some() {
        tracing::info!(steps = data.computed_vectors().len(), "accumulated sequence loss");
    }
    Ok(total)
}
