fn main() {
    if let Err(err) = mindmap_canvas::run() {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}
