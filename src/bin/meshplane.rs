use meshplane::cli;

fn main() -> anyhow::Result<()> {
    cli::run_cli()
}
