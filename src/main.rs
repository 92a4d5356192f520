use miqroforge::cli::{Args, Runner};
use miqroforge::logging::Logger;

#[tokio::main]
async fn main() {
    let args = Args::parse_args();

    let runner = match Runner::new(args) {
        Ok(runner) => runner,
        Err(e) => {
            Logger::new(false).error(&e.to_string());
            std::process::exit(e.exit_code());
        }
    };

    if let Err(e) = runner.run().await {
        runner.output().error(&e.to_string());
        std::process::exit(e.exit_code());
    }
}
