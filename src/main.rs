fn main() -> anyhow::Result<()> {
    camstash_lib::run()
}
