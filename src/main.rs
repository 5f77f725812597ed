use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

mod context;
mod evidence;
mod graph;
mod parser;
mod spec;
mod topology;
mod validate;

pub type Result<T> = anyhow::Result<T>;

#[derive(Parser)]
#[command(name = "p4-seedcheck")]
#[command(about = "Evidence extraction and candidate verification for P4 pipeline tests", long_about = None)]
struct Cli {
    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Args)]
struct ContextArgs {
    /// BMv2 program description (JSON).
    #[arg(long)]
    program: PathBuf,

    /// Directory of Graphviz control-flow graphs (one .dot per block).
    #[arg(long)]
    graphs: PathBuf,

    /// Topology description (JSON).
    #[arg(long)]
    topology: PathBuf,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a candidate bundle against its task contract.
    Validate {
        #[command(flatten)]
        ctx: ContextArgs,

        /// Task specification (task.json).
        #[arg(long)]
        task: PathBuf,

        /// Candidate bundle (candidate.json).
        #[arg(long)]
        candidate: PathBuf,
    },
    /// Query ground-truth evidence from the program context.
    Evidence {
        #[command(flatten)]
        ctx: ContextArgs,

        #[command(subcommand)]
        query: EvidenceQuery,
    },
}

#[derive(Subcommand)]
enum EvidenceQuery {
    /// All tables with key/action signatures.
    Tables,
    /// One table's key/action signature.
    Table { name: String },
    /// One action's runtime parameter signature and primitive ops.
    Action { name: String },
    /// Header instance -> field -> bitwidth.
    Headers,
    /// Every protocol stack the parser accepts.
    ParserPaths,
    /// Field/value constraints selecting each parser branch.
    ParserTransitions,
    /// Bitwidth of one header field, e.g. "Ethernet.etherType".
    HeaderBits { field: String },
    /// Registers, counters and meters.
    Stateful,
    /// Topology host/link summary.
    Hosts,
    /// Zone classification for one host.
    Zone { host: String },
    /// Default (internal, external) host pair for scenario seeding.
    DefaultPair,
    /// Tables ranked by depth in a control-flow graph.
    RankedTables {
        #[arg(long, default_value = "MyIngress")]
        graph: String,
    },
    /// Branch conditions along a bounded path to a table node.
    PathConstraints {
        target: String,

        #[arg(long, default_value = "MyIngress")]
        graph: String,
    },
    /// Adjacency of the control-flow graph keyed by node label.
    JumpDict {
        #[arg(long, default_value = "MyIngress")]
        graph: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.cmd {
        Commands::Validate {
            ctx,
            task,
            candidate,
        } => {
            let ctx = load_context(&ctx)?;
            let task: spec::TaskSpec = read_json(&task)?;
            let bundle: spec::CandidateBundle = read_json(&candidate)?;
            run_validators(&ctx, &task, &bundle)
        }
        Commands::Evidence { ctx, query } => {
            let ctx = load_context(&ctx)?;
            run_query(&ctx, query)
        }
    }
}

fn load_context(args: &ContextArgs) -> Result<context::ProgramContext> {
    context::ProgramContext::load(&args.program, &args.graphs, &args.topology)
}

fn read_json<T: serde::de::DeserializeOwned>(path: &PathBuf) -> Result<T> {
    use anyhow::Context;
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("read {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parse {}", path.display()))
}

/// Run every validator that applies to the bundle, print one verdict line
/// each, and exit non-zero if any failed.
fn run_validators(
    ctx: &context::ProgramContext,
    task: &spec::TaskSpec,
    bundle: &spec::CandidateBundle,
) -> Result<()> {
    let mut verdicts = vec![(
        "packet_sequence",
        validate::validate_packet_sequence(ctx, task, &bundle.packet_sequence),
    )];

    if !bundle.entities.is_empty() {
        let control_plane = if bundle.control_plane_sequence.is_empty() {
            None
        } else {
            Some(bundle.control_plane_sequence.as_slice())
        };
        verdicts.push((
            "entities",
            validate::validate_entities(
                ctx,
                task,
                &bundle.packet_sequence,
                &bundle.entities,
                control_plane,
            ),
        ));
    }

    if !bundle.execution_sequence.is_empty() {
        verdicts.push((
            "execution_sequence",
            validate::validate_execution(
                &bundle.packet_sequence,
                &bundle.entities,
                &bundle.control_plane_sequence,
                &bundle.execution_sequence,
            ),
        ));
    }

    let mut all_pass = true;
    for (name, verdict) in &verdicts {
        println!("{name}: {} - {}", verdict.status.as_str(), verdict.feedback);
        all_pass &= verdict.is_pass();
    }
    if !all_pass {
        std::process::exit(1);
    }
    Ok(())
}

fn run_query(ctx: &context::ProgramContext, query: EvidenceQuery) -> Result<()> {
    use anyhow::bail;

    let lookup_graph = |name: &str| -> Result<&graph::ControlGraph> {
        match ctx.graph(name) {
            Some(g) => Ok(g),
            None => bail!("no control graph named '{name}' (loaded: {:?})", ctx.graphs.keys().collect::<Vec<_>>()),
        }
    };

    let out = match query {
        EvidenceQuery::Tables => serde_json::to_value(evidence::tables(ctx))?,
        EvidenceQuery::Table { name } => match evidence::table(ctx, &name) {
            Some(t) => serde_json::to_value(t)?,
            None => bail!("unknown table '{name}'"),
        },
        EvidenceQuery::Action { name } => match evidence::action(ctx, &name) {
            Some(a) => serde_json::to_value(a)?,
            None => bail!("unknown action '{name}'"),
        },
        EvidenceQuery::Headers => serde_json::to_value(evidence::headers(ctx))?,
        EvidenceQuery::ParserPaths => serde_json::to_value(parser::protocol_stacks(ctx))?,
        EvidenceQuery::ParserTransitions => {
            serde_json::to_value(parser::transition_constraints(ctx))?
        }
        EvidenceQuery::HeaderBits { field } => {
            serde_json::to_value(parser::header_bits(ctx, &field))?
        }
        EvidenceQuery::Stateful => serde_json::to_value(evidence::stateful_objects(ctx))?,
        EvidenceQuery::Hosts => serde_json::to_value(topology::summarize(ctx))?,
        EvidenceQuery::Zone { host } => {
            serde_json::to_value(topology::classify_zone(ctx, &host).as_str())?
        }
        EvidenceQuery::DefaultPair => serde_json::to_value(topology::default_host_pair(ctx))?,
        EvidenceQuery::RankedTables { graph } => {
            serde_json::to_value(lookup_graph(&graph)?.ranked_tables())?
        }
        EvidenceQuery::PathConstraints { target, graph } => {
            serde_json::to_value(lookup_graph(&graph)?.path_constraints(&target))?
        }
        EvidenceQuery::JumpDict { graph } => {
            serde_json::to_value(lookup_graph(&graph)?.jump_dict())?
        }
    };

    println!("{}", serde_json::to_string_pretty(&out)?);
    Ok(())
}
