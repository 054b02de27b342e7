fn main() {
    if let Err(err) = termgraph_renderer::run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
