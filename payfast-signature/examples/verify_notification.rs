//! Authenticates a payment notification the way a notify URL handler would.
//!
//! Simulates the gateway posting a signed notification, then a tampered copy,
//! and shows the decision, the HTTP response and the order state change.
//!
//! # Running this example
//!
//! ```bash
//! RUST_LOG=info cargo run --example verify_notification
//! ```

#![allow(
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::uninlined_format_args,
    reason = "examples are allowed to use println and simple formatting"
)]

use payfast_signature::{
    MerchantConfig, PaymentFieldSet,
    notification::{NotificationDecision, NotificationReceiver, OrderPaymentState, Transition},
};

const SANDBOX_CONFIG: &str = r#"
    merchant_id = "10000100"
    merchant_key = "46f0cd694581a"
    passphrase = "jt7NOE43FZPn"
    sandbox = true
"#;

/// What the gateway would post for a completed payment.
fn gateway_body(config: &MerchantConfig) -> Result<String, Box<dyn std::error::Error>> {
    let fields = PaymentFieldSet::new()
        .with_field("m_payment_id", "order-42")
        .with_field("pf_payment_id", "1089250")
        .with_field("payment_status", "COMPLETE")
        .with_field("item_name", "Blue shoes")
        .with_field("amount_gross", "249.99")
        .with_field("amount_fee", "-5.75")
        .with_field("amount_net", "244.24")
        .with_field("merchant_id", config.merchant_id.as_str());

    let signature = config.codec().sign(&fields);
    let mut pairs: Vec<(&str, &str)> =
        fields.iter().filter_map(|(name, value)| value.map(|v| (name, v))).collect();
    pairs.push(("signature", signature.as_str()));
    Ok(serde_urlencoded::to_string(pairs)?)
}

fn handle(receiver: &NotificationReceiver, order: &mut OrderPaymentState, body: &str) {
    let decision = receiver.receive(body.as_bytes());
    let response = decision.response();
    println!("   HTTP {} {}", response.status, response.body);

    match decision {
        NotificationDecision::Accepted(notification) => {
            match order.apply(&notification.payment_status) {
                Transition::Changed { from, to } => {
                    println!("   order {}: {:?} -> {:?}", notification.m_payment_id, from, to);
                    *order = to;
                }
                Transition::Unchanged(state) => {
                    println!("   order {}: still {:?}", notification.m_payment_id, state);
                }
            }
        }
        NotificationDecision::Rejected { m_payment_id, reason } => {
            println!("   order {}: untouched ({})", m_payment_id, reason);
        }
        NotificationDecision::Malformed { reason } => {
            println!("   ignored: {}", reason);
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt().with_target(true).with_writer(std::io::stderr).init();

    println!("PayFast: Verify Notification Example\n");

    let config = MerchantConfig::from_toml(SANDBOX_CONFIG)?;
    config.validate()?;
    let receiver = NotificationReceiver::new(&config);
    let mut order = OrderPaymentState::Pending;

    let body = gateway_body(&config)?;

    println!("1. Tampered notification (amount changed in transit)...");
    handle(&receiver, &mut order, &body.replace("amount_gross=249.99", "amount_gross=2.99"));

    println!("\n2. Authentic notification...");
    handle(&receiver, &mut order, &body);

    println!("\n3. Same notification redelivered...");
    handle(&receiver, &mut order, &body);

    println!("\nFinal order state: {:?}", order);
    Ok(())
}
