use anyhow::Result;

fn main() -> Result<()> {
    variant_integrity::cli::run()
}
