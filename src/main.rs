use std::process::ExitCode;

#[core_async::main]
async fn main() -> ExitCode {
    bucket_sync::run(std::env::args_os()).await
}
