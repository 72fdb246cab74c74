//! The recurrence driver: unrolls the cell formulas over a sequence.

use super::cell::{self, Dim, CELL, HIDDEN, INPUT, PARAMETERS, PREVIOUS_CELL, PREVIOUS_HIDDEN};
use super::dataset::DataSet;
use super::loss::{self, Loss};
use crate::error::{Error, Result};
use crate::graph::Graph;
use crate::runtime::{Formula, Key, StepContext, SymbolTable};

/// Sizes of the cell and the step cap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LstmConfig {
    pub input_size: usize,
    pub hidden_size: usize,
    pub output_size: usize,
    /// Step cap when the data source gives no length hint
    pub max_steps: usize,
}

impl Default for LstmConfig {
    fn default() -> Self {
        Self {
            input_size: 64,
            hidden_size: 100,
            output_size: 64,
            max_steps: 10_000,
        }
    }
}

impl LstmConfig {
    /// Config for predicting the next symbol of a vocabulary of `size`.
    pub fn for_vocab(size: usize) -> Self {
        Self::default().with_input_size(size).with_output_size(size)
    }

    pub fn with_input_size(mut self, size: usize) -> Self {
        self.input_size = size;
        self
    }

    pub fn with_hidden_size(mut self, size: usize) -> Self {
        self.hidden_size = size;
        self
    }

    pub fn with_output_size(mut self, size: usize) -> Self {
        self.output_size = size;
        self
    }

    pub fn with_max_steps(mut self, steps: usize) -> Self {
        self.max_steps = steps;
        self
    }

    fn dim(&self, dim: Dim) -> usize {
        match dim {
            Dim::Input => self.input_size,
            Dim::Hidden => self.hidden_size,
            Dim::Output => self.output_size,
        }
    }
}

/// Hidden and cell state carried from one step to the next.
#[derive(Debug, Clone)]
pub struct RecurrenceState<N> {
    pub hidden: N,
    pub cell: N,
}

/// An LSTM whose cell is compiled from formulas at every step.
pub struct Lstm<G: Graph> {
    config: LstmConfig,
    symbols: SymbolTable<G::Node>,
    formulas: [Formula; 6],
    projection: Formula,
    initial: RecurrenceState<G::Node>,
}

impl<G: Graph> Lstm<G> {
    /// Register the cell parameters in `graph` and start from zero state.
    pub fn new(graph: &G, config: LstmConfig) -> Result<Self> {
        let mut symbols = SymbolTable::new();
        for (name, dims) in PARAMETERS {
            let shape: Vec<usize> = dims.iter().map(|d| config.dim(*d)).collect();
            symbols.set(Key::fixed(name), graph.parameter(name, &shape)?);
        }

        let initial = RecurrenceState {
            hidden: graph.zeros(&[config.hidden_size])?,
            cell: graph.zeros(&[config.hidden_size])?,
        };

        Ok(Self {
            config,
            symbols,
            formulas: cell::step_formulas(),
            projection: cell::output_projection(),
            initial,
        })
    }

    pub fn config(&self) -> &LstmConfig {
        &self.config
    }

    pub fn symbols(&self) -> &SymbolTable<G::Node> {
        &self.symbols
    }

    /// State the next call to [`cost`](Self::cost) starts from.
    pub fn initial_state(&self) -> &RecurrenceState<G::Node> {
        &self.initial
    }

    pub fn set_initial_state(&mut self, state: RecurrenceState<G::Node>) {
        self.initial = state;
    }

    /// Unroll the cell over `data`, starting from `initial`.
    ///
    /// Every step's output probabilities are recorded with `data`. Returns the
    /// state of the last step (or `initial` for an empty sequence). Reading
    /// more steps than the data source's length hint, or `max_steps` without
    /// a hint, is an error.
    pub fn forward<D>(
        &mut self,
        graph: &G,
        data: &mut D,
        initial: RecurrenceState<G::Node>,
    ) -> Result<RecurrenceState<G::Node>>
    where
        D: DataSet<G> + ?Sized,
    {
        let limit = data.len_hint().unwrap_or(self.config.max_steps);

        let start = StepContext::new(0);
        self.symbols.set(start.key(PREVIOUS_HIDDEN), initial.hidden.clone());
        self.symbols.set(start.key(PREVIOUS_CELL), initial.cell.clone());

        let mut state = initial;
        for step in 0..limit {
            let input = match data.read_input_vector(graph)? {
                Some(input) => input,
                None => {
                    tracing::info!(steps = step, "forward pass finished");
                    return Ok(state);
                }
            };
            let (next, probs) = self.step(graph, StepContext::new(step), input)?;
            data.write_computed_vector(probs);
            state = next;
        }

        match data.read_input_vector(graph)? {
            None => {
                tracing::info!(steps = limit, "forward pass finished");
                Ok(state)
            }
            Some(_) => Err(Error::StepLimit { limit }),
        }
    }

    /// Compile one step; returns its state and output probabilities.
    fn step(
        &mut self,
        graph: &G,
        ctx: StepContext,
        input: G::Node,
    ) -> Result<(RecurrenceState<G::Node>, G::Node)> {
        self.symbols.set(ctx.key(INPUT), input);
        for formula in &self.formulas {
            self.symbols.assign(graph, ctx, formula)?;
        }
        let y = self.symbols.assign(graph, ctx, &self.projection)?;
        let probs = graph.softmax(&y)?;

        let state = RecurrenceState {
            hidden: self.bound(ctx.key(HIDDEN))?,
            cell: self.bound(ctx.key(CELL))?,
        };
        Ok((state, probs))
    }

    fn bound(&self, key: Key) -> Result<G::Node> {
        self.symbols
            .get(&key)
            .cloned()
            .ok_or_else(|| Error::UndefinedIdentifier {
                name: key.name().to_string(),
                key: key.to_string(),
                offset: 0,
            })
    }

    /// Run the sequence from the model's initial state and sum its losses.
    ///
    /// On success the final state becomes the initial state of the next
    /// call, so consecutive chunks of a long text continue the recurrence.
    /// `data` must not hold outputs recorded by an earlier pass.
    pub fn cost<D>(&mut self, graph: &G, data: &mut D) -> Result<Option<Loss<G::Node>>>
    where
        D: DataSet<G> + ?Sized,
    {
        let recorded = data.computed_vectors().len();
        if recorded > 0 {
            tracing::warn!(recorded, "data source holds outputs of an earlier pass");
            return Err(Error::StaleOutputs { recorded });
        }

        let last = self.forward(graph, data, self.initial.clone())?;
        let loss = loss::accumulate(graph, data)?;
        self.initial = last;
        Ok(loss)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{CandleGraph, TraceGraph, TraceNode, TraceOp};
    use crate::lstm::dataset::CharSequence;
    use candle_core::{Device, Tensor};

    /// Yields `vectors` one-hot inputs, failing on read number `fail_at`.
    struct Scripted<N> {
        vectors: usize,
        fail_at: Option<usize>,
        hint: Option<usize>,
        reads: usize,
        outputs: Vec<N>,
    }

    impl<N> Scripted<N> {
        fn new(vectors: usize) -> Self {
            Self {
                vectors,
                fail_at: None,
                hint: None,
                reads: 0,
                outputs: Vec::new(),
            }
        }
    }

    impl<G: Graph> DataSet<G> for Scripted<G::Node> {
        fn read_input_vector(&mut self, graph: &G) -> Result<Option<G::Node>> {
            if self.fail_at == Some(self.reads) {
                return Err(Error::DataSource("read failed".into()));
            }
            if self.reads == self.vectors {
                return Ok(None);
            }
            let v = graph.one_hot(self.reads % 3, 3)?;
            self.reads += 1;
            Ok(Some(v))
        }

        fn write_computed_vector(&mut self, vector: G::Node) {
            self.outputs.push(vector);
        }

        fn computed_vectors(&self) -> &[G::Node] {
            &self.outputs
        }

        fn expected_value(&self, step: usize) -> Result<usize> {
            Ok(step % 3)
        }

        fn len_hint(&self) -> Option<usize> {
            self.hint
        }
    }

    fn trace_model() -> (TraceGraph, Lstm<TraceGraph>) {
        let g = TraceGraph::new();
        let config = LstmConfig::for_vocab(3).with_hidden_size(2);
        let model = Lstm::new(&g, config).unwrap();
        (g, model)
    }

    #[test]
    fn test_forward_runs_every_step() {
        let (g, mut model) = trace_model();
        let mut data: Scripted<TraceNode> = Scripted::new(4);
        let initial = model.initial_state().clone();

        let last = model.forward(&g, &mut data, initial).unwrap();

        assert_eq!(data.outputs.len(), 4);
        // 14 parameters, the initial state, 8 bindings per step
        assert_eq!(model.symbols().len(), 14 + 2 + 4 * 8);
        assert_eq!(Some(&last.hidden), model.symbols().get(&Key::at("h", 3)));
        assert_eq!(Some(&last.cell), model.symbols().get(&Key::at("c", 3)));
        assert!(!model.symbols().contains(&Key::at("x", 4)));
    }

    #[test]
    fn test_empty_sequence_returns_initial_state() {
        let (g, mut model) = trace_model();
        let mut data: Scripted<TraceNode> = Scripted::new(0);
        let initial = model.initial_state().clone();

        let last = model.forward(&g, &mut data, initial.clone()).unwrap();
        assert_eq!(last.hidden, initial.hidden);
        assert_eq!(last.cell, initial.cell);
        assert!(data.outputs.is_empty());
    }

    #[test]
    fn test_steps_chain_through_hidden_state() {
        let (g, mut model) = trace_model();
        let mut data: Scripted<TraceNode> = Scripted::new(2);
        let initial = model.initial_state().clone();
        model.forward(&g, &mut data, initial.clone()).unwrap();

        let symbols = model.symbols();
        let h0 = symbols.get(&Key::at("h", 0)).unwrap();
        let i1 = symbols.get(&Key::at("i", 1)).unwrap();
        // σ(((Wᵢ · x1) + (Uᵢ · h0)) + Bᵢ)
        assert_eq!(i1.op(), &TraceOp::Sigmoid);
        let recurrent = &i1.inputs()[0].inputs()[0].inputs()[1];
        assert_eq!(recurrent.op(), &TraceOp::MatMul);
        assert_eq!(&recurrent.inputs()[1], h0);

        let i0 = symbols.get(&Key::at("i", 0)).unwrap();
        assert_eq!(i0.inputs()[0].inputs()[0].inputs()[1].inputs()[1], initial.hidden);
    }

    #[test]
    fn test_cell_state_formula() {
        let (g, mut model) = trace_model();
        let mut data: Scripted<TraceNode> = Scripted::new(1);
        let initial = model.initial_state().clone();
        let last = model.forward(&g, &mut data, initial).unwrap();

        let symbols = model.symbols();
        let expected = format!(
            "(({} * {}) + ({} * {}))",
            symbols.get(&Key::at("f", 0)).unwrap(),
            symbols.get(&Key::at("c", -1)).unwrap(),
            symbols.get(&Key::at("i", 0)).unwrap(),
            symbols.get(&Key::at("ĉ", 0)).unwrap(),
        );
        assert_eq!(last.cell.to_string(), expected);
        assert_eq!(data.outputs[0].op(), &TraceOp::Softmax);
    }

    #[test]
    fn test_data_source_error_stops_before_step() {
        let (g, mut model) = trace_model();
        let mut data: Scripted<TraceNode> = Scripted::new(5);
        data.fail_at = Some(2);
        let initial = model.initial_state().clone();

        let result = model.forward(&g, &mut data, initial);
        assert!(matches!(result, Err(Error::DataSource(_))));

        assert_eq!(data.outputs.len(), 2);
        assert!(model.symbols().contains(&Key::at("h", 1)));
        for name in ["x", "i", "f", "o", "ĉ", "c", "h", "y"] {
            for step in 2..5 {
                assert!(!model.symbols().contains(&Key::at(name, step)));
            }
        }
    }

    #[test]
    fn test_step_limit() {
        let (g, mut model) = trace_model();
        model.config.max_steps = 3;
        let mut data: Scripted<TraceNode> = Scripted::new(5);
        let initial = model.initial_state().clone();

        let result = model.forward(&g, &mut data, initial);
        assert!(matches!(result, Err(Error::StepLimit { limit: 3 })));
        assert_eq!(data.outputs.len(), 3);
    }

    #[test]
    fn test_length_hint_is_the_cap() {
        let (g, mut model) = trace_model();
        let mut data: Scripted<TraceNode> = Scripted::new(3);
        data.hint = Some(3);
        let initial = model.initial_state().clone();

        model.forward(&g, &mut data, initial.clone()).unwrap();
        assert_eq!(data.outputs.len(), 3);

        let mut data: Scripted<TraceNode> = Scripted::new(4);
        data.hint = Some(3);
        assert!(matches!(
            model.forward(&g, &mut data, initial),
            Err(Error::StepLimit { limit: 3 })
        ));
    }

    #[test]
    fn test_compile_error_stops_the_recurrence() {
        let (g, mut model) = trace_model();
        model.projection = Formula::new("yₜ", "Wy·hₜ+Bz");
        let mut data: Scripted<TraceNode> = Scripted::new(3);
        let initial = model.initial_state().clone();

        let result = model.forward(&g, &mut data, initial);
        assert!(matches!(result, Err(Error::UndefinedIdentifier { ref name, .. }) if name == "Bz"));
        assert!(data.outputs.is_empty());
        assert!(!model.symbols().contains(&Key::at("x", 1)));
    }

    #[test]
    fn test_cost_on_text() {
        let g = CandleGraph::with_device(Device::Cpu);
        let mut data: CharSequence<Tensor> = CharSequence::from_text("hello world").unwrap();
        let config = LstmConfig::for_vocab(data.vocab().len()).with_hidden_size(8);
        let mut model = Lstm::new(&g, config).unwrap();
        let zero_state = model.initial_state().hidden.id();

        let loss = model.cost(&g, &mut data).unwrap().unwrap();
        let ce: f32 = loss.cross_entropy.to_scalar().unwrap();
        let perp: f32 = loss.perplexity.to_scalar().unwrap();

        assert!(ce.is_finite() && ce > 0.0);
        assert!((perp * std::f32::consts::LN_2 - ce).abs() < 1e-3 * ce);
        assert_ne!(model.initial_state().hidden.id(), zero_state);
        assert_eq!(model.initial_state().hidden.dims(), &[8]);
    }

    #[test]
    fn test_cost_keeps_state_on_failure() {
        let (g, mut model) = trace_model();
        let initial = model.initial_state().hidden.clone();
        let mut data: Scripted<TraceNode> = Scripted::new(3);
        data.fail_at = Some(1);

        assert!(model.cost(&g, &mut data).is_err());
        assert_eq!(model.initial_state().hidden, initial);
    }

    #[test]
    fn test_cost_rejects_reused_sequence() {
        let g = CandleGraph::with_device(Device::Cpu);
        let mut data: CharSequence<Tensor> = CharSequence::from_text("abcab").unwrap();
        let config = LstmConfig::for_vocab(data.vocab().len()).with_hidden_size(4);
        let mut model = Lstm::new(&g, config).unwrap();

        assert!(model.cost(&g, &mut data).unwrap().is_some());
        let carried = model.initial_state().hidden.id();

        assert!(matches!(
            model.cost(&g, &mut data),
            Err(Error::StaleOutputs { recorded: 4 })
        ));
        assert_eq!(model.initial_state().hidden.id(), carried);

        data.reset();
        assert!(model.cost(&g, &mut data).unwrap().is_some());
        assert_ne!(model.initial_state().hidden.id(), carried);
    }
}
