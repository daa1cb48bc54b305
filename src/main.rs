fn main() -> anyhow::Result<()> {
    connview::run()
}
