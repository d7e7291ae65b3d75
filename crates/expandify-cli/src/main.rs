fn main() {
    expandify_cli::run_main();
}
