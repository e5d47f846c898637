fn main() {
    std::process::exit(jvm_bootstrap_lib::run());
}
