fn main() {
    wire_relay::cli::main();
}
