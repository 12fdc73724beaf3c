use anyhow::Result;

fn main() -> Result<()> {
    picreg_cli::run()
}
