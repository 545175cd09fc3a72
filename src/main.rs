use anyhow::Context as _;
use clap::Parser;
use parsegen::{
    codegen::{self, Tables},
    diagnostics::SourceFile,
    errors::Error,
    lalr, report, syntax,
};
use std::{fs, path::PathBuf, process::ExitCode};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// The path of the input grammar file.
    input: PathBuf,

    /// Place the output analyzer into <file>.
    #[arg(short = 'o', long = "outfile", value_name = "file", default_value = "parser_analyzer.inl")]
    outfile: PathBuf,

    /// Place the output definitions into <file>.
    #[arg(long = "header-file", value_name = "file", default_value = "parser_defs.h")]
    header_file: PathBuf,

    /// Write a human-readable grammar/automaton report into <file>.
    #[arg(long = "report-file", value_name = "file")]
    report_file: Option<PathBuf>,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    tracing::debug!("parsed CLI args = {:?}", args);

    match run(&args) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(err) => {
            tracing::error!("{:#}", err);
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> anyhow::Result<bool> {
    let file_name = args.input.display().to_string();
    let source = fs::read_to_string(&args.input)
        .with_context(|| format!("could not open input file `{}`", file_name))?;

    let grammar = match syntax::parse(&file_name, &source) {
        Ok(grammar) => grammar,
        Err(Error::Grammar(err)) => {
            eprintln!("{}", SourceFile::new(&source).render(&file_name, &err));
            return Ok(false);
        }
        Err(err) => return Err(err.into()),
    };

    tracing::info!("{}: building analyzer...", file_name);
    let output = lalr::build(&grammar)?;
    tracing::info!(
        "{}: done: {} shift/reduce, {} reduce/reduce conflict(s) found",
        file_name,
        output.conflicts.shift_reduce,
        output.conflicts.reduce_reduce
    );

    // An artifact that fails to write is skipped; the remaining artifacts
    // are still produced and the failure shows in the exit status.
    let mut ok = true;

    if let Some(path) = &args.report_file {
        let mut buf = Vec::new();
        report::write_report(&mut buf, &grammar, &output)?;
        if let Err(err) = fs::write(path, &buf) {
            tracing::error!("could not open report file `{}`: {}", path.display(), err);
            ok = false;
        }
    }

    let mut buf = Vec::new();
    codegen::write_defs(&mut buf, &grammar)?;
    if let Err(err) = fs::write(&args.header_file, &buf) {
        tracing::error!(
            "could not open output file `{}`: {}",
            args.header_file.display(),
            err
        );
        ok = false;
    }

    let tables = Tables::new(&grammar, &output);
    let mut buf = Vec::new();
    codegen::write_analyzer(&mut buf, &tables)?;
    if let Err(err) = fs::write(&args.outfile, &buf) {
        tracing::error!(
            "could not open output file `{}`: {}",
            args.outfile.display(),
            err
        );
        ok = false;
    }

    Ok(ok)
}
