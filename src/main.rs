//! lstm-formula REPL - compile tensor formulas interactively.

use candle_core::Tensor;
use lstm_formula::lstm::DataSet;
use lstm_formula::{
    compile, CandleGraph, CharSequence, Formula, Graph, Lstm, LstmConfig, Result, StepContext,
    SymbolTable, TraceGraph, TraceNode,
};
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use std::env;
use std::fs;
use tracing_subscriber::EnvFilter;

/// Everything the REPL has bound so far.
///
/// Each binding lives twice: as a candle tensor for values and as a named
/// symbolic node so `:trace` can show the structure of an expression.
struct Session {
    graph: CandleGraph,
    symbols: SymbolTable<Tensor>,
    trace: TraceGraph,
    traced: SymbolTable<TraceNode>,
    ctx: StepContext,
}

impl Session {
    fn new() -> Self {
        Self {
            graph: CandleGraph::new(),
            symbols: SymbolTable::new(),
            trace: TraceGraph::new(),
            traced: SymbolTable::new(),
            ctx: StepContext::default(),
        }
    }

    fn bind(&mut self, name: &str, tensor: Tensor) -> Result<()> {
        let key = self.ctx.key(name);
        let node = self.trace.parameter(&key.to_string(), tensor.dims())?;
        self.traced.set(key.clone(), node);
        self.symbols.set(key, tensor);
        Ok(())
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let args: Vec<String> = env::args().collect();
    let mut session = Session::new();

    // If a file argument is provided, execute it line by line
    if args.len() > 1 {
        let file_path = &args[1];
        let content = match fs::read_to_string(file_path) {
            Ok(content) => content,
            Err(e) => {
                eprintln!("Error loading {}: {}", file_path, e);
                std::process::exit(1);
            }
        };
        for line in content.lines() {
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            if !handle_line(trimmed, &mut session) {
                break;
            }
        }
        return Ok(());
    }

    println!("lstm-formula v{}", env!("CARGO_PKG_VERSION"));
    println!("Type :help for commands, :quit to exit\n");

    run_repl(session)
}

fn run_repl(mut session: Session) -> Result<()> {
    let mut rl = match DefaultEditor::new() {
        Ok(rl) => rl,
        Err(e) => {
            eprintln!("Failed to create editor: {}", e);
            std::process::exit(1);
        }
    };

    loop {
        let line = match rl.readline(&format!("t={}> ", session.ctx.step())) {
            Ok(line) => line,
            // ^C drops the current line only
            Err(ReadlineError::Interrupted) => continue,
            Err(ReadlineError::Eof) => break,
            Err(err) => {
                tracing::error!(%err, "readline failed");
                break;
            }
        };

        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let _ = rl.add_history_entry(line);
        if !handle_line(line, &mut session) {
            return Ok(());
        }
    }

    println!("Bye!");
    Ok(())
}

/// Returns false if the REPL should exit.
fn handle_line(line: &str, session: &mut Session) -> bool {
    if line.starts_with(':') {
        return handle_command(line, session);
    }

    let result = if line.contains('=') {
        Formula::parse(line).and_then(|formula| {
            let ctx = session.ctx;
            let tensor = session.symbols.assign(&session.graph, ctx, &formula)?;
            session.traced.assign(&session.trace, ctx, &formula)?;
            Ok((ctx.rewrite(formula.lhs()), tensor))
        })
    } else {
        compile(&session.graph, &session.symbols, session.ctx, line).map(|t| ("_".to_string(), t))
    };

    match result {
        Ok((name, tensor)) => print_tensor(&name, &tensor),
        Err(e) => println!("Error: {}", e),
    }
    true
}

/// Handle REPL commands (starting with :)
/// Returns false if REPL should exit
fn handle_command(cmd: &str, session: &mut Session) -> bool {
    let parts: Vec<&str> = cmd.split_whitespace().collect();
    let command = parts[0];

    match command {
        ":quit" | ":q" | ":exit" => {
            println!("Bye!");
            return false;
        }

        ":help" | ":h" | ":?" => print_help(),

        ":step" | ":t" => match parts.get(1).map(|s| s.parse::<usize>()) {
            Some(Ok(step)) => {
                session.ctx = StepContext::new(step);
                println!("Step set to {}", step);
            }
            _ => println!("Usage: :step <n>"),
        },

        ":zeros" | ":rand" | ":let" => {
            // :let Name dim1 dim2 ...
            if parts.len() < 3 {
                println!("Usage: {} <name> <dim1> [dim2] ...", command);
                return true;
            }
            let name = parts[1];
            let dims: std::result::Result<Vec<usize>, _> =
                parts[2..].iter().map(|s| s.parse()).collect();
            let dims = match dims {
                Ok(d) => d,
                Err(e) => {
                    println!("Invalid dimensions: {}", e);
                    return true;
                }
            };
            let tensor = if command == ":zeros" {
                session.graph.zeros(&dims)
            } else {
                Tensor::rand(0.0f32, 1.0, &dims[..], session.graph.device()).map_err(Into::into)
            };
            match tensor.and_then(|t| session.bind(name, t)) {
                Ok(()) => println!("Bound {} with shape {:?}", session.ctx.rewrite(name), dims),
                Err(e) => println!("Error: {}", e),
            }
        }

        ":const" => {
            // :const 2.5 binds the literal `2.5` to a scalar
            let value = match parts.get(1).map(|s| (*s, s.parse::<f32>())) {
                Some((text, Ok(v))) => (text, v),
                _ => {
                    println!("Usage: :const <number>");
                    return true;
                }
            };
            let (text, v) = value;
            match session
                .graph
                .constant(&[v], &[])
                .and_then(|t| session.bind(text, t))
            {
                Ok(()) => println!("Bound literal {}", text),
                Err(e) => println!("Error: {}", e),
            }
        }

        ":trace" => {
            let expr = cmd[command.len()..].trim();
            match compile(&session.trace, &session.traced, session.ctx, expr) {
                Ok(node) => println!("{}", node),
                Err(e) => println!("Error: {}", e),
            }
        }

        ":lstm" => {
            let text = cmd[command.len()..].trim();
            if let Err(e) = run_lstm(text) {
                println!("Error: {}", e);
            }
        }

        _ => {
            println!("Unknown command: {}. Type :help for available commands.", command);
        }
    }

    true
}

/// Unroll a fresh LSTM over `text` and report its loss.
fn run_lstm(text: &str) -> Result<()> {
    let graph = CandleGraph::new();
    let mut data: CharSequence<Tensor> = CharSequence::from_text(text)?;
    let config = LstmConfig::for_vocab(data.vocab().len()).with_hidden_size(32);
    let mut model = Lstm::new(&graph, config)?;

    match model.cost(&graph, &mut data)? {
        Some(loss) => {
            let steps = DataSet::<CandleGraph>::computed_vectors(&data).len();
            let ce: f32 = loss.cross_entropy.to_scalar()?;
            let perp: f32 = loss.perplexity.to_scalar()?;
            println!("steps: {}", steps);
            println!("cross-entropy: {:.4} ({:.4} per step)", ce, ce / steps as f32);
            println!("perplexity: {:.4}", (perp / steps as f32).exp2());
        }
        None => println!("Text too short: need at least two characters"),
    }
    Ok(())
}

fn print_help() {
    println!(
        r#"Commands:
  :help, :h, :?          Show this help
  :quit, :q              Exit the REPL
  :step, :t <n>          Set the step that ₜ and ₜ₋₁ resolve to
  :zeros <name> <d..>    Bind a zero tensor
  :let, :rand <name> <d..>  Bind a random tensor
  :const <number>        Bind a literal so formulas can use it
  :trace <expr>          Show the graph an expression compiles to
  :lstm <text>           Unroll a fresh LSTM over text and print its loss

Formulas:
  hₜ = oₜ*tanh(cₜ)       Compile and bind (names resolve for the current step)
  Wy·hₜ + By             Compile and print
  ·  matrix product      *, ×  elementwise product      /, ÷  division
  σ, sigmoid, tanh, softmax, log, log2   built-in functions"#
    );
}

/// Print a node's value, one row per line of the last axis.
fn print_tensor(name: &str, t: &Tensor) {
    let values = match t.flatten_all().and_then(|flat| flat.to_vec1::<f32>()) {
        Ok(values) => values,
        Err(_) => {
            println!("{} = {:?}", name, t);
            return;
        }
    };
    let row = |chunk: &[f32]| {
        let cells: Vec<String> = chunk.iter().map(|v| format!("{:.4}", v)).collect();
        format!("[{}]", cells.join(", "))
    };

    match t.dims() {
        [] => println!("{} = {:.4}", name, values[0]),
        [_] => println!("{} : {:?} = {}", name, t.dims(), row(&values)),
        dims => {
            println!("{} : {:?} =", name, dims);
            let width = dims[dims.len() - 1].max(1);
            for chunk in values.chunks(width) {
                println!("  {}", row(chunk));
            }
        }
    }
}
