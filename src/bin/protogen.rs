//! Command-line driver for the schema compiler.

use std::path::PathBuf;
use std::process;

use clap::Parser;

use protogen::{Config, CPLUSPLUS};

#[derive(Parser)]
#[command(
    name = "protogen",
    version,
    about = "Compile Protocol Buffers schemas into C++ message classes"
)]
struct Args {
    /// Schema files to compile.
    #[arg(required = true, value_name = "PROTO")]
    protos: Vec<PathBuf>,

    /// Directory the generated files are written into.
    #[arg(short, long, default_value = "generated", value_name = "DIR")]
    out_dir: PathBuf,

    /// Project name prefixed to generated include guards.
    #[arg(long, default_value = "", value_name = "NAME")]
    project_name: String,

    /// Target language tag to generate for.
    #[arg(long, default_value = CPLUSPLUS, value_name = "TAG")]
    language: String,

    /// Do not write the shared runtime-support header.
    #[arg(long)]
    no_common: bool,
}

fn main() {
    env_logger::init();
    let args = Args::parse();

    let mut config = Config::new();
    config
        .project_name(&args.project_name)
        .language(&args.language);
    if args.no_common {
        config.skip_common_code();
    }

    if let Err(err) = config.compile_protos(&args.protos, &args.out_dir) {
        eprintln!("protogen: {}", err);
        process::exit(1);
    }
}
