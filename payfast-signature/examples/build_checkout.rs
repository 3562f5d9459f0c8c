//! Builds a signed payment form for the sandbox gateway.
//!
//! Prints the fields an HTML form would post and a ready-made auto-submit page.
//!
//! # Running this example
//!
//! ```bash
//! cargo run --example build_checkout
//! ```
//!
//! Set `PAYFAST_CONFIG` to a TOML file to use your own merchant account
//! instead of the public sandbox credentials.

#![allow(
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::uninlined_format_args,
    reason = "examples are allowed to use println and simple formatting"
)]

use std::{env, path::Path};

use payfast_signature::{
    MerchantConfig,
    checkout::{PaymentRequest, SigningMode, build_payment},
};
use rust_decimal::Decimal;

const SANDBOX_CONFIG: &str = r#"
    merchant_id = "10000100"
    merchant_key = "46f0cd694581a"
    passphrase = "jt7NOE43FZPn"
    sandbox = true
    return_url = "https://shop.example.com/return"
    cancel_url = "https://shop.example.com/cancel"
    notify_url = "https://shop.example.com/payfast/itn"
"#;

fn load_config() -> Result<MerchantConfig, Box<dyn std::error::Error>> {
    let config = match env::var("PAYFAST_CONFIG") {
        Ok(path) => MerchantConfig::from_file(Path::new(&path))?,
        Err(_) => MerchantConfig::from_toml(SANDBOX_CONFIG)?,
    };
    config.validate()?;
    Ok(config)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("PayFast: Build Checkout Example\n");

    println!("1. Loading merchant configuration...");
    let config = load_config()?;
    println!("   {:?}\n", config);

    println!("2. Describing the order...");
    let mut request = PaymentRequest::new(Decimal::new(24999, 2), "Blue shoes")
        .with_m_payment_id("order-42")
        .with_email_address("buyer@example.com");
    request.item_description = Some("Size 42, suede".to_owned());
    request.custom_str.push("gift-wrap".to_owned());
    println!("   amount: {}, item: {}\n", request.amount, request.item_name);

    println!("3. Building the signed form...");
    let redirect = build_payment(&config, &request, SigningMode::Signed)?;
    println!("   POST {}", redirect.process_url);
    for (name, value) in redirect.form_fields() {
        println!("   {name:<16} {value}");
    }

    println!("\n4. Auto-submit page:\n");
    println!("<form id=\"payfast\" action=\"{}\" method=\"post\">", redirect.process_url);
    for (name, value) in redirect.form_fields() {
        println!(
            "  <input type=\"hidden\" name=\"{}\" value=\"{}\">",
            name,
            value.replace('&', "&amp;").replace('"', "&quot;")
        );
    }
    println!("</form>");
    println!("<script>document.getElementById('payfast').submit();</script>");

    Ok(())
}
