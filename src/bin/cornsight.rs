fn main() -> anyhow::Result<()> {
    corn_sight::cli::run()
}
