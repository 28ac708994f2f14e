//! Connectivity check against the Visa Developer Platform sandbox.
//!
//! Calls `vdp/helloworld` over mutual TLS, then fetches one enrollment record
//! if `VOP_USER_KEY` is set.
//!
//! # Running this example
//!
//! The `VISA_API_*` variables hold PEM contents, not file paths:
//! ```bash
//! export VISA_API_BASE_URL=https://sandbox.api.visa.com
//! export VISA_API_CLIENT_CERT="$(cat cert.pem)"
//! export VISA_API_PRIVATE_KEY="$(cat key.pem)"
//! export VISA_API_COMMUNITY_CODE=ACMECU
//! export VISA_API_USER_ID=...
//! export VISA_API_PASSWORD=...
//! cargo run --example hello_world
//! ```

#![allow(
    clippy::print_stdout,
    clippy::print_stderr,
    reason = "examples are allowed to use println"
)]

use vop_client::{ClientConfig, VopClient, VopError};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let client = VopClient::new(ClientConfig::from_env())?;

    let hello = client.hello_world().await?;
    println!("helloworld: {hello:#}");

    if let Ok(user_key) = std::env::var("VOP_USER_KEY") {
        match client.get_user(&user_key).await {
            Ok(record) => println!("enrollment record: {record:#}"),
            Err(VopError::RemoteError { status, body, .. }) => {
                eprintln!("lookup rejected with {status}: {body}");
            }
            Err(e) => return Err(e.into()),
        }
    }

    Ok(())
}
