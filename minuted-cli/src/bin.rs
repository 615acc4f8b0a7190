//! Meeting minutes pipeline worker
//!
//! Provides a cli for running and linting the pipeline workers that turn
//! uploaded meeting recordings into delivered minutes.
use minuted::Error;
use minuted_cmd::run;

#[tokio::main]
async fn main() -> Result<(), Error> {
    run().await
}
