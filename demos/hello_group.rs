use rankwise::{channel, CommGroup};

fn main() {
    env_logger::init();
    let size: u32 = std::env::args()
        .nth(1)
        .and_then(|s| s.parse().ok())
        .unwrap_or(4);

    channel::run_on_threads(size, |group| {
        println!(
            "Hello world from rank {} of {} on {}",
            group.rank(),
            group.size(),
            group.host_label()
        );
    })
    .unwrap_or_else(|e| {
        eprintln!("{e}");
        std::process::exit(1);
    });
}
