fn main() -> anyhow::Result<()> {
    gridplan::run()?;
    Ok(())
}
