//! Raw-transport round trip: scatter a buffer, scale every element in
//! place, and gather the segments back with the collective gather.

use rankwise::{channel, CommGroup, Error};

fn main() {
    env_logger::init();
    let size: u32 = std::env::args()
        .nth(1)
        .and_then(|s| s.parse().ok())
        .unwrap_or(4);

    let results = channel::run_on_threads(size, move |group| -> Result<Vec<f64>, Error> {
        if group.rank() == 0 {
            let buffer: Vec<f64> = (0..size * 8).map(|i| i as f64).collect();
            let mut data = group.scatter(&buffer)?;
            for elm in &mut data {
                *elm *= 4.0;
            }
            group.gather(&data)
        } else {
            let mut data: Vec<f64> = group.scatter_recv(0)?;
            for elm in &mut data {
                *elm *= 4.0;
            }
            group.gather_send(0, &data)?;
            Ok(vec![])
        }
    })
    .unwrap_or_else(|e| {
        eprintln!("{e}");
        std::process::exit(1);
    });

    match &results[0] {
        Ok(result) => println!("Gather result of {result:?}"),
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(1);
        }
    }
}
