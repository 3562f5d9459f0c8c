//! `payfast`: sign PayFast payments and check notifications from the shell.
//!
//! Exit codes:
//! - `0`: success (signature matched, notification accepted)
//! - `1`: signature mismatch or rejected notification
//! - `2`: usage, input or configuration error

mod observability;

use std::{
    io::{self, Read, Write},
    path::{Path, PathBuf},
    process::ExitCode,
};

use clap::{Args, Parser, Subcommand};
use payfast_signature::{
    MerchantConfig, PayfastError, PaymentFieldSet, SignatureCodec,
    checkout::{PaymentRedirect, PaymentRequest, SigningMode, build_payment},
    notification::{NotificationDecision, NotificationReceiver},
    signature::{EncodingMode, SIGNATURE_FIELD, SigningOptions},
};
use rust_decimal::Decimal;
use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use crate::observability::{LogFormat, init_observability};

/// Largest form body accepted on stdin.
const MAX_STDIN_BYTES: u64 = 64 * 1024;

#[derive(Parser, Debug)]
#[command(name = "payfast", version, about = "Sign PayFast payments and check notifications")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the canonical string that gets hashed.
    Canonicalize {
        #[command(flatten)]
        input: FieldInput,
        /// Use values verbatim instead of percent-encoding them.
        #[arg(long)]
        raw: bool,
    },
    /// Print the signature for a field set.
    Sign {
        #[command(flatten)]
        input: FieldInput,
        #[command(flatten)]
        signing: SigningArgs,
    },
    /// Check a claimed signature. Exits 1 on mismatch.
    Verify {
        /// Claimed signature. Defaults to the input's `signature` field.
        #[arg(long, value_name = "HEX")]
        signature: Option<String>,
        #[command(flatten)]
        input: FieldInput,
        #[command(flatten)]
        signing: SigningArgs,
    },
    /// Build the payment form for an order.
    Checkout(CheckoutArgs),
    /// Authenticate a notification body read from stdin. Exits 1 unless accepted.
    Notify {
        /// Merchant configuration file.
        #[arg(long, value_name = "PATH")]
        config: PathBuf,
    },
}

#[derive(Args, Debug)]
struct FieldInput {
    /// Field to include, repeatable. Without any, a form body is read from stdin.
    #[arg(long = "field", value_name = "NAME=VALUE", value_parser = parse_field)]
    fields: Vec<(String, String)>,
}

#[derive(Args, Debug)]
struct SigningArgs {
    /// Merchant configuration file supplying passphrase and encoding.
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Passphrase, overriding the configuration file.
    #[arg(long, value_name = "PASSPHRASE")]
    passphrase: Option<String>,
    /// Use values verbatim instead of percent-encoding them.
    #[arg(long)]
    raw: bool,
}

#[derive(Args, Debug)]
struct CheckoutArgs {
    /// Merchant configuration file.
    #[arg(long, value_name = "PATH")]
    config: PathBuf,
    /// Order amount, rounded to cents.
    #[arg(long)]
    amount: Decimal,
    /// Item name shown on the payment page.
    #[arg(long)]
    item_name: String,
    #[arg(long)]
    item_description: Option<String>,
    /// Merchant order reference echoed back in notifications.
    #[arg(long)]
    m_payment_id: Option<String>,
    #[arg(long)]
    email_address: Option<String>,
    /// Custom string, repeatable (at most 5).
    #[arg(long = "custom-str", value_name = "VALUE")]
    custom_str: Vec<String>,
    /// Custom integer, repeatable (at most 5).
    #[arg(long = "custom-int", value_name = "VALUE")]
    custom_int: Vec<i64>,
    /// Build the form without a signature.
    #[arg(long)]
    unsigned: bool,
}

#[derive(Debug, Error)]
enum CliError {
    #[error(transparent)]
    Payfast(#[from] PayfastError),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("input exceeds {MAX_STDIN_BYTES} bytes")]
    InputTooLarge,

    #[error("no signature given: pass --signature or include a signature field")]
    MissingSignature,

    #[error("failed to encode output: {0}")]
    Output(#[from] serde_json::Error),
}

type CliResult<T> = Result<T, CliError>;

fn main() -> ExitCode {
    init_observability(LogFormat::from_env());
    let cli = Cli::parse();

    match run(cli.command) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::from(2)
        }
    }
}

fn run(command: Command) -> CliResult<ExitCode> {
    match command {
        Command::Canonicalize { input, raw } => {
            let fields = input.resolve(&mut io::stdin().lock())?;
            let encoding = if raw { EncodingMode::Raw } else { EncodingMode::UrlEncoded };
            let codec = SignatureCodec::new(SigningOptions::default().with_encoding(encoding));
            emit_line(&codec.canonicalize(&fields))?;
            Ok(ExitCode::SUCCESS)
        }
        Command::Sign { input, signing } => {
            let codec = signing.codec()?;
            let fields = input.resolve(&mut io::stdin().lock())?;
            emit_line(&codec.sign(&fields))?;
            Ok(ExitCode::SUCCESS)
        }
        Command::Verify { signature, input, signing } => {
            let codec = signing.codec()?;
            let fields = input.resolve(&mut io::stdin().lock())?;
            let claimed = signature
                .or_else(|| fields.get(SIGNATURE_FIELD).map(str::to_owned))
                .ok_or(CliError::MissingSignature)?;

            if codec.verify(Some(&claimed), &fields) {
                emit_line("valid")?;
                Ok(ExitCode::SUCCESS)
            } else {
                emit_line("invalid")?;
                Ok(ExitCode::FAILURE)
            }
        }
        Command::Checkout(args) => checkout(args),
        Command::Notify { config } => notify(&config, &mut io::stdin().lock()),
    }
}

fn checkout(args: CheckoutArgs) -> CliResult<ExitCode> {
    let config = MerchantConfig::from_file(&args.config)?;
    let mode = if args.unsigned { SigningMode::Unsigned } else { SigningMode::Signed };
    let request = PaymentRequest {
        amount: args.amount,
        item_name: args.item_name,
        item_description: args.item_description,
        m_payment_id: args.m_payment_id,
        email_address: args.email_address,
        custom_str: args.custom_str,
        custom_int: args.custom_int,
        ..PaymentRequest::default()
    };

    let redirect = build_payment(&config, &request, mode)?;
    emit_line(&serde_json::to_string_pretty(&CheckoutOutput::from_redirect(&redirect)?)?)?;
    Ok(ExitCode::SUCCESS)
}

fn notify(config_path: &Path, stdin: &mut impl Read) -> CliResult<ExitCode> {
    let config = MerchantConfig::from_file(config_path)?;
    config.validate()?;

    let body = read_limited(stdin)?;
    let decision = NotificationReceiver::new(&config).receive(trim_line_end(&body));
    let code = if decision.is_accepted() { ExitCode::SUCCESS } else { ExitCode::FAILURE };

    emit_line(&serde_json::to_string_pretty(&NotifyOutput::from(&decision))?)?;
    Ok(code)
}

impl FieldInput {
    /// Fields from `--field` flags, or else a form body from `stdin`.
    fn resolve(self, stdin: &mut impl Read) -> CliResult<PaymentFieldSet> {
        if !self.fields.is_empty() {
            return Ok(self.fields.into_iter().collect());
        }
        let body = read_limited(stdin)?;
        Ok(PaymentFieldSet::from_form_body(trim_line_end(&body))?)
    }
}

impl SigningArgs {
    fn codec(&self) -> CliResult<SignatureCodec> {
        let mut options = match &self.config {
            Some(path) => MerchantConfig::from_file(path)?.signing_options(),
            None => SigningOptions::default(),
        };
        if let Some(passphrase) = &self.passphrase {
            options = options.with_passphrase(passphrase.as_str());
        }
        if self.raw {
            options = options.with_encoding(EncodingMode::Raw);
        }
        debug!(encoding = ?options.encoding, "signing options resolved");
        Ok(SignatureCodec::new(options))
    }
}

fn parse_field(raw: &str) -> Result<(String, String), String> {
    raw.split_once('=')
        .map(|(name, value)| (name.to_owned(), value.to_owned()))
        .ok_or_else(|| format!("expected NAME=VALUE, got '{raw}'"))
}

fn read_limited(reader: &mut impl Read) -> CliResult<Vec<u8>> {
    let mut body = Vec::new();
    reader.take(MAX_STDIN_BYTES + 1).read_to_end(&mut body)?;
    if body.len() as u64 > MAX_STDIN_BYTES {
        return Err(CliError::InputTooLarge);
    }
    Ok(body)
}

/// Drops the newline a shell pipeline usually leaves on a body.
fn trim_line_end(body: &[u8]) -> &[u8] {
    let body = body.strip_suffix(b"\n").unwrap_or(body);
    body.strip_suffix(b"\r").unwrap_or(body)
}

fn emit_line(line: &str) -> CliResult<()> {
    let mut stdout = io::stdout().lock();
    writeln!(stdout, "{line}")?;
    Ok(())
}

#[derive(Debug, Serialize)]
struct FormField {
    name: String,
    value: String,
}

#[derive(Debug, Serialize)]
struct CheckoutOutput {
    process_url: String,
    signed: bool,
    fields: Vec<FormField>,
    form_body: String,
}

impl CheckoutOutput {
    fn from_redirect(redirect: &PaymentRedirect) -> CliResult<Self> {
        Ok(Self {
            process_url: redirect.process_url.to_string(),
            signed: redirect.signature.is_some(),
            fields: redirect
                .form_fields()
                .into_iter()
                .map(|(name, value)| FormField { name, value })
                .collect(),
            form_body: redirect.to_form_body()?,
        })
    }
}

#[derive(Debug, Serialize)]
struct HttpResponse {
    status: u16,
    body: &'static str,
}

#[derive(Debug, Serialize)]
struct NotifyOutput {
    decision: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    m_payment_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    payment_status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    reason: Option<String>,
    response: HttpResponse,
}

impl From<&NotificationDecision> for NotifyOutput {
    fn from(decision: &NotificationDecision) -> Self {
        let response = decision.response();
        let response = HttpResponse { status: response.status, body: response.body };
        match decision {
            NotificationDecision::Accepted(notification) => Self {
                decision: "accepted",
                m_payment_id: Some(notification.m_payment_id.clone()),
                payment_status: Some(notification.payment_status.to_string()),
                reason: None,
                response,
            },
            NotificationDecision::Rejected { m_payment_id, reason } => Self {
                decision: "rejected",
                m_payment_id: Some(m_payment_id.clone()),
                payment_status: None,
                reason: Some(reason.to_string()),
                response,
            },
            NotificationDecision::Malformed { reason } => Self {
                decision: "malformed",
                m_payment_id: None,
                payment_status: None,
                reason: Some(reason.clone()),
                response,
            },
        }
    }
}
