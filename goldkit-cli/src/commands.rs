//! Subcommands and their implementations.

use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use eyre::{eyre, Result, WrapErr};
use goldkit_core::api::{AuthApi, GoldApiClient};
use goldkit_core::defaults::ApiConfig;
use goldkit_core::gate::{setup, GateConfig, GatePhase, PinGateController, PIN_LENGTH};
use goldkit_core::notifications::{PushNotifications, SessionManager};
use goldkit_core::otp::{normalize_phone, OtpConfig, OtpController, OtpPurpose};
use goldkit_core::session::SessionStore;
use goldkit_core::{Environment, GoldKitError};
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};

use crate::store::FileStore;
use crate::terminal::{prompt, NoPush, TerminalNavigator};

/// goldkit - drive the gold savings auth flows from a terminal
#[derive(Parser)]
#[command(name = "goldkit")]
#[command(about = "OTP login, MPIN creation, unlock and reset against the gold savings API")]
#[command(version)]
pub struct Cli {
    /// Flow to run
    #[command(subcommand)]
    pub command: Commands,

    /// Deployment to talk to (staging or production)
    #[arg(long, env = "GOLDKIT_ENV", default_value = "staging", value_parser = parse_environment)]
    pub env: Environment,

    /// Override the API base URL
    #[arg(long, env = "GOLDKIT_BASE_URL")]
    pub base_url: Option<String>,

    /// Directory holding the session file
    #[arg(long, env = "GOLDKIT_STATE_DIR")]
    pub state_dir: Option<PathBuf>,
}

/// One flow per subcommand.
#[derive(Subcommand)]
pub enum Commands {
    /// Request an SMS OTP
    SendOtp {
        /// Mobile number, with or without +91
        #[arg(long)]
        phone: String,
    },

    /// Sign in with an SMS OTP and store the session
    Login {
        /// Mobile number, with or without +91
        #[arg(long)]
        phone: String,
    },

    /// Create the account's MPIN (prompts twice)
    CreatePin,

    /// Interactive MPIN gate
    Unlock,

    /// Change the MPIN using the current one
    ResetPin {
        /// Current MPIN
        #[arg(long)]
        old: String,

        /// New MPIN
        #[arg(long)]
        new: String,
    },

    /// Set a new MPIN after OTP re-verification
    ResetPinDirect {
        /// New MPIN
        #[arg(long)]
        new: String,
    },

    /// Clear the stored session
    Logout,
}

fn parse_environment(value: &str) -> Result<Environment, String> {
    Environment::from_str(value).map_err(|_| format!("unknown environment `{value}`"))
}

struct Context {
    api: Arc<GoldApiClient>,
    sessions: SessionStore,
    navigator: Arc<TerminalNavigator>,
}

impl Context {
    fn open(cli: &Cli) -> Result<Self> {
        let mut config = ApiConfig::from_environment(cli.env);
        if let Some(base_url) = &cli.base_url {
            config = ApiConfig::new(base_url)?;
        }
        let state_dir = match &cli.state_dir {
            Some(dir) => dir.clone(),
            None => dirs::data_dir()
                .ok_or_else(|| eyre!("no data directory; pass --state-dir"))?
                .join("goldkit"),
        };
        let store = FileStore::open(&state_dir)
            .wrap_err_with(|| format!("opening state in {}", state_dir.display()))?;
        let sessions = SessionStore::new(Arc::new(store));

        tracing::debug!(base_url = %config.base_url, state_dir = %state_dir.display(), "cli context");
        let api = Arc::new(GoldApiClient::new(config));
        if let Some(session) = sessions.load()? {
            api.set_auth_token(Some(session.token));
        }
        Ok(Self {
            api,
            sessions,
            navigator: Arc::new(TerminalNavigator),
        })
    }

    fn require_session(&self) -> Result<()> {
        if self.sessions.load()?.is_none() {
            return Err(eyre!("not signed in; run `goldkit login --phone <number>` first"));
        }
        Ok(())
    }
}

type StdinLines = Lines<BufReader<Stdin>>;

async fn read_line(lines: &mut StdinLines, label: &str) -> Result<Option<String>> {
    prompt(label)?;
    Ok(lines.next_line().await?.map(|l| l.trim().to_string()))
}

/// Runs one subcommand.
///
/// # Errors
/// Any failure of the underlying flow.
pub async fn run(cli: Cli) -> Result<()> {
    let ctx = Context::open(&cli)?;
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    match cli.command {
        Commands::SendOtp { phone } => {
            let phone = normalize_phone(&phone)?;
            ctx.api.send_otp(&phone).await?;
            println!("OTP sent to {phone}");
        }
        Commands::Login { phone } => login(&ctx, &phone, &mut lines).await?,
        Commands::CreatePin => {
            ctx.require_session()?;
            create_pin(&ctx, &mut lines).await?;
        }
        Commands::Unlock => {
            ctx.require_session()?;
            unlock(&ctx, &mut lines).await?;
        }
        Commands::ResetPin { old, new } => {
            ctx.require_session()?;
            setup::reset_pin_with_old(ctx.api.as_ref(), &old, &new, &new).await?;
            println!("MPIN changed");
        }
        Commands::ResetPinDirect { new } => {
            ctx.require_session()?;
            setup::reset_pin_direct(ctx.api.as_ref(), &ctx.sessions, &new, &new).await?;
            println!("MPIN reset");
        }
        Commands::Logout => {
            let push = Arc::new(PushNotifications::new(Arc::new(NoPush)));
            SessionManager::new(ctx.sessions.clone(), push, ctx.navigator.clone())
                .logout(ctx.api.as_ref())?;
            println!("signed out");
        }
    }
    Ok(())
}

async fn login(ctx: &Context, phone: &str, lines: &mut StdinLines) -> Result<()> {
    let otp = OtpController::new(
        phone,
        OtpPurpose::Login,
        ctx.api.clone(),
        ctx.navigator.clone(),
        ctx.sessions.clone(),
        OtpConfig::default(),
    )?;
    otp.send_otp().await?;
    println!("OTP sent to {}", otp.snapshot().phone);

    loop {
        let Some(code) = read_line(lines, "OTP: ").await? else {
            return Err(eyre!("no OTP entered"));
        };
        if let Err(e) = otp.set_code(&code) {
            println!("{e}");
            continue;
        }
        match otp.verify().await {
            Ok(Some(user)) => {
                println!("signed in as {}", user.name.unwrap_or(user.phone));
                return Ok(());
            }
            Ok(None) => return Ok(()),
            Err(e @ (GoldKitError::PinRejected { .. } | GoldKitError::InvalidInput { .. })) => {
                println!("{e}");
            }
            Err(e) => return Err(e.into()),
        }
    }
}

async fn create_pin(ctx: &Context, lines: &mut StdinLines) -> Result<()> {
    let mut entry = setup::PinSetup::new();
    loop {
        let Some(first) = read_line(lines, "New MPIN: ").await? else {
            return Ok(());
        };
        if let Err(e) = entry.enter(&first) {
            println!("{e}");
            continue;
        }
        let Some(second) = read_line(lines, "Confirm MPIN: ").await? else {
            return Ok(());
        };
        match entry.confirm(&second) {
            Ok(pin) => {
                setup::create_pin(ctx.api.as_ref(), &ctx.sessions, &pin).await?;
                println!("MPIN created");
                return Ok(());
            }
            Err(e) => println!("{e}"),
        }
    }
}

async fn unlock(ctx: &Context, lines: &mut StdinLines) -> Result<()> {
    let gate = PinGateController::new(
        ctx.api.clone(),
        ctx.navigator.clone(),
        ctx.sessions.clone(),
        GateConfig::default(),
    )?;
    println!("enter your {PIN_LENGTH} digit MPIN, or `forgot`");

    loop {
        match gate.snapshot().phase {
            GatePhase::Accepted => {
                println!("unlocked");
                return Ok(());
            }
            GatePhase::Locked => {
                wait_for_unlock(&gate).await;
                continue;
            }
            GatePhase::NotProvisioned => {
                println!("this account has no MPIN yet");
                gate.create_pin_now();
                return Ok(());
            }
            _ => {}
        }

        let Some(line) = read_line(lines, "MPIN: ").await? else {
            return Ok(());
        };
        if line == "forgot" {
            gate.forgot_pin();
            gate.confirm_forgot();
            println!("verify with `goldkit login`, then run `goldkit reset-pin-direct`");
            return Ok(());
        }
        if line.len() != PIN_LENGTH || !line.chars().all(|c| c.is_ascii_digit()) {
            println!("Please enter a {PIN_LENGTH} digit MPIN");
            continue;
        }
        for (position, digit) in line.chars().enumerate() {
            gate.append_digit(&digit.to_string(), position)?;
        }
        gate.submit().await?;
        if let Some(message) = gate.snapshot().message {
            println!("{message}");
        }
    }
}

async fn wait_for_unlock(gate: &PinGateController<GoldApiClient>) {
    while let Some(remaining) = gate.snapshot().lock_remaining_seconds {
        prompt(&format!("\rlocked, try again in {remaining:>2}s")).ok();
        tokio::time::sleep(Duration::from_secs(1)).await;
    }
    println!();
}
