use recovery::RecoveryError;

fn main() -> Result<(), RecoveryError> {
    tokio::runtime::Builder::new_multi_thread()
        // Cap the number of blocking threads - password hashing runs there and a burst of
        // resets shouldn't be able to spawn an unbounded number of them.
        .max_blocking_threads(num_cpus::get())
        .enable_all()
        .build()
        .map_err(|err| recovery::ErrorCode::InvalidConfiguration.with_msg(&format!("Unable to start the runtime: {}", err)))?
        .block_on(async {
            recovery::lib_main().await
        })
}
