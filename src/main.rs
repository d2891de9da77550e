//! COINFLIP: terminal table
//!
//! Entry point. Loads configuration, initialises structured logging,
//! opens a flip table with a fair coin and reads player commands from
//! stdin until `quit` or Ctrl+C.

use anyhow::{Context, Result};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::Arc;
use std::time::Instant;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info, warn};

use coinflip::auth::{self, HttpAuthClient};
use coinflip::cashier::Cashier;
use coinflip::config::AppConfig;
use coinflip::engine::{FairCoin, FlipTable, SettlementHandle};
use coinflip::forms::{
    DepositForm, ForgotPasswordForm, LoginForm, RegistrationForm, ResetPasswordForm,
    VerificationForm, WithdrawalForm,
};
use coinflip::recovery::{PasswordRecovery, RecoveryError};
use coinflip::types::{CurrencyCode, Side, SettlementResult};

const BANNER: &str = r#"
  ____ ___ ___ _   _ _____ _     ___ ____
 / ___/ _ \_ _| \ | |  ___| |   |_ _|  _ \
| |  | | | | ||  \| | |_  | |    | || |_) |
| |__| |_| | || |\  |  _| | |___ | ||  __/
 \____\___/___|_| \_|_|   |_____|___|_|

  Call it in the air.
  v0.1.0
"#;

const HELP: &str = "\
commands:
  side <head|tail>              pick a side
  stake <amount>                set the stake
  currency <IN|AU|CA|PK|SE>     switch currency (resets the stake)
  flip [amount] [side]          flip with the current or given stake/side
  cancel                        void the flip in the air
  status                        show the session
  login <email> <password>      sign in
  register <email> <code> <phone> <password> <confirm>
  forgot <email|phone>          send a password reset code
  resend                        send the code again
  verify <code>                 enter the reset code
  reset <password> <confirm>    choose a new password
  withdraw <name> <bank> <ifsc> <account> <confirm>
                                request a withdrawal (use _ for spaces)
  deposit                       show where to pay
  deposit attach <file>         attach a JPG/PNG payment screenshot
  deposit submit                submit the deposit proof
  help                          this text
  quit                          leave the table";

#[derive(Debug, Clone, PartialEq)]
enum Command {
    Side(Side),
    Stake(String),
    Currency(CurrencyCode),
    Flip {
        amount: Option<String>,
        side: Option<Side>,
    },
    Cancel,
    Status,
    Login {
        email: String,
        password: String,
    },
    Register(Vec<String>),
    Forgot(String),
    Resend,
    Verify(String),
    Reset {
        password: String,
        confirm: String,
    },
    Withdraw(WithdrawalForm),
    DepositInfo,
    DepositAttach(String),
    DepositSubmit,
    Help,
    Quit,
}

fn parse_command(line: &str) -> Result<Option<Command>> {
    let mut words = line.split_whitespace();
    let Some(head) = words.next() else {
        return Ok(None);
    };
    let args: Vec<&str> = words.collect();

    let cmd = match (head.to_ascii_lowercase().as_str(), args.as_slice()) {
        ("side", [side]) => Command::Side(side.parse()?),
        ("stake", [amount]) => Command::Stake(amount.to_string()),
        ("currency", [code]) => Command::Currency(code.parse()?),
        ("flip", []) => Command::Flip { amount: None, side: None },
        ("flip", [one]) => match one.parse::<Side>() {
            Ok(side) => Command::Flip { amount: None, side: Some(side) },
            Err(_) => Command::Flip { amount: Some(one.to_string()), side: None },
        },
        ("flip", [amount, side]) => Command::Flip {
            amount: Some(amount.to_string()),
            side: Some(side.parse()?),
        },
        ("cancel", []) => Command::Cancel,
        ("status", []) => Command::Status,
        ("login", [email, password]) => Command::Login {
            email: email.to_string(),
            password: password.to_string(),
        },
        ("register", rest) if rest.len() == 5 => {
            Command::Register(rest.iter().map(|s| s.to_string()).collect())
        }
        ("forgot", [contact]) => Command::Forgot(contact.to_string()),
        ("resend", []) => Command::Resend,
        ("verify", [code]) => Command::Verify(code.to_string()),
        ("reset", [password, confirm]) => Command::Reset {
            password: password.to_string(),
            confirm: confirm.to_string(),
        },
        ("withdraw", [name, bank, ifsc, account, confirm]) => Command::Withdraw(WithdrawalForm {
            name: name.replace('_', " "),
            bank: bank.replace('_', " "),
            ifsc: ifsc.to_string(),
            account: account.to_string(),
            confirm_account: confirm.to_string(),
        }),
        ("deposit", []) => Command::DepositInfo,
        ("deposit", ["attach", path]) => Command::DepositAttach(path.to_string()),
        ("deposit", ["submit"]) => Command::DepositSubmit,
        ("help" | "?", _) => Command::Help,
        ("quit" | "exit", _) => Command::Quit,
        (other, _) => anyhow::bail!("unrecognised command {other:?}; type `help`"),
    };
    Ok(Some(cmd))
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (non-fatal if missing)
    let _ = dotenv::dotenv();

    let cfg = startup("config.toml")?;

    println!("{BANNER}");
    info!(
        balance = %cfg.game.initial_balance,
        minimum_stake = %cfg.game.minimum_stake,
        currency = %cfg.game.default_currency,
        "COINFLIP starting up"
    );

    let coin = FairCoin::new(StdRng::from_entropy());
    let (table, mut results) = FlipTable::from_config(&cfg.game, coin);
    let authenticator = Arc::new(HttpAuthClient::new(&cfg.auth)?);
    let cashier = Arc::new(Cashier::from_config(&cfg.account));
    let mut recovery = PasswordRecovery::from_config(&cfg.account);
    let mut deposit = DepositForm::default();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut in_flight: Option<SettlementHandle> = None;

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    println!("{HELP}");
    println!("{}", table.with_session(|s| s.to_string()).await);

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line.context("Failed to read stdin")? else {
                    info!("stdin closed.");
                    break;
                };

                let cmd = match parse_command(&line) {
                    Ok(Some(cmd)) => cmd,
                    Ok(None) => continue,
                    Err(e) => {
                        println!("{e}");
                        continue;
                    }
                };

                match cmd {
                    Command::Quit => break,
                    Command::Help => println!("{HELP}"),
                    Command::Status => println!("{}", table.with_session(|s| s.to_string()).await),
                    Command::Side(side) => report(table.select_side(side).await),
                    Command::Currency(code) => report(table.select_currency(code).await),
                    Command::Stake(amount) => report(table.set_stake(amount).await),
                    Command::Flip { amount, side } => {
                        let placed = match (amount, side) {
                            (None, None) => table.flip_current().await,
                            (amount, side) => {
                                let (current_stake, current_side) = table
                                    .with_session(|s| (s.stake_amount(), s.chosen_side()))
                                    .await;
                                let stake = amount.unwrap_or_else(|| current_stake.to_string());
                                table.flip(stake, side.unwrap_or(current_side)).await
                            }
                        };
                        match placed {
                            Ok(handle) => {
                                println!("Flipping...");
                                in_flight = Some(handle);
                            }
                            Err(e) => println!("{}", capitalise(&e.to_string())),
                        }
                    }
                    Command::Cancel => {
                        let cancelled = in_flight.as_mut().is_some_and(|h| h.cancel());
                        if cancelled {
                            println!("Flip cancelled; balance unchanged.");
                        } else {
                            println!("Nothing to cancel.");
                        }
                    }
                    Command::Login { email, password } => {
                        let auth = Arc::clone(&authenticator);
                        tokio::spawn(async move {
                            let form = LoginForm::new(email, password);
                            match auth::sign_in(&*auth, &form).await {
                                Ok(resp) if resp.is_authenticated() => println!("Logged in."),
                                Ok(resp) => println!(
                                    "{}",
                                    resp.message.unwrap_or_else(|| "Login failed.".to_string())
                                ),
                                Err(e) => println!("{}", e.user_message()),
                            }
                        });
                    }
                    Command::Register(fields) => {
                        let auth = Arc::clone(&authenticator);
                        tokio::spawn(async move {
                            let form = RegistrationForm::new(
                                fields[0].clone(),
                                fields[1].clone(),
                                fields[2].clone(),
                                fields[3].clone(),
                                fields[4].clone(),
                            );
                            match auth::register(&*auth, &form).await {
                                Ok(_) => println!("Account created."),
                                Err(e) => println!("{}", e.user_message()),
                            }
                        });
                    }
                    Command::Forgot(contact) => {
                        let now = Instant::now();
                        match recovery.request_code(&ForgotPasswordForm { contact }, now) {
                            Ok(()) => println!(
                                "Code sent. Resend available in {}s.",
                                recovery.resend_remaining(now).as_secs()
                            ),
                            Err(e) => print_recovery_error(&e),
                        }
                    }
                    Command::Resend => match recovery.resend(Instant::now()) {
                        Ok(()) => println!("New code sent!"),
                        Err(e) => print_recovery_error(&e),
                    },
                    Command::Verify(code) => match recovery.verify(&VerificationForm { code }) {
                        Ok(()) => println!("Code verified. Choose a new password with `reset`."),
                        Err(e) => print_recovery_error(&e),
                    },
                    Command::Reset { password, confirm } => {
                        match recovery.reset(&ResetPasswordForm::new(password, confirm)) {
                            Ok(()) => {
                                println!("Password reset. You can log in now.");
                                recovery = PasswordRecovery::from_config(&cfg.account);
                            }
                            Err(e) => print_recovery_error(&e),
                        }
                    }
                    Command::Withdraw(mut form) => {
                        let desk = Arc::clone(&cashier);
                        println!("Submitting withdrawal...");
                        tokio::spawn(async move {
                            match desk.submit_withdrawal(&mut form).await {
                                Ok(receipt) => println!(
                                    "Withdrawal request submitted successfully! ({} {})",
                                    receipt.bank, receipt.account
                                ),
                                Err(errors) => println!("{errors}"),
                            }
                        });
                    }
                    Command::DepositInfo => {
                        println!("Pay to UPI ID: {}", cashier.upi_id());
                        match &deposit.screenshot {
                            Some(path) => println!("Screenshot: {}", path.display()),
                            None => println!("No file selected"),
                        }
                    }
                    Command::DepositAttach(path) => {
                        deposit.attach(path);
                        match deposit.validate() {
                            Ok(()) => println!("Screenshot attached."),
                            Err(errors) => println!("{errors}"),
                        }
                    }
                    Command::DepositSubmit => match cashier.submit_deposit(&deposit) {
                        Ok(receipt) => {
                            println!("Submitted! Reference {}", receipt.request_id);
                            deposit = DepositForm::default();
                        }
                        Err(errors) => println!("{errors}"),
                    },
                }
            }
            Some(result) = results.recv() => {
                in_flight = None;
                print_settlement(&result);
            }
            _ = &mut shutdown => {
                info!("Shutdown signal received.");
                break;
            }
        }
    }

    if let Some(mut handle) = in_flight {
        if handle.cancel() {
            warn!(bet_id = %handle.bet_id(), "Voiding flip left in the air");
            let _ = handle.wait().await;
        }
    }

    let summary = table.snapshot().await;
    info!(
        balance = %summary.balance,
        flips = summary.stats.flips,
        wins = summary.stats.wins,
        net_pnl = %summary.stats.net_pnl,
        "COINFLIP shut down cleanly."
    );

    Ok(())
}

fn report<E: std::fmt::Display>(outcome: Result<(), E>) {
    match outcome {
        Ok(()) => println!("OK"),
        Err(e) => println!("{}", capitalise(&e.to_string())),
    }
}

fn print_recovery_error(e: &RecoveryError) {
    match e {
        RecoveryError::Invalid(errors) => {
            for field in &errors.0 {
                println!("{}", field.message);
            }
        }
        other => println!("{}", capitalise(&other.to_string())),
    }
}

fn print_settlement(result: &SettlementResult) {
    let headline = if result.won { "You won!" } else { "You lost!" };
    println!("{headline} {result}");
}

fn capitalise(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Logging goes up before the config is read so its messages are kept.
fn startup(config_path: &str) -> Result<AppConfig> {
    init_logging();
    AppConfig::load_or_default(config_path)
}

/// Initialise the `tracing` subscriber.
fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("coinflip=info"));

    let json_logging = std::env::var("COINFLIP_LOG_JSON").is_ok();

    let result = if json_logging {
        fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_thread_ids(true)
            .with_writer(std::io::stderr)
            .try_init()
    } else {
        fmt()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_writer(std::io::stderr)
            .try_init()
    };
    if let Err(e) = result {
        error!(error = %e, "Logging already initialised");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_commands() {
        assert_eq!(parse_command("").unwrap(), None);
        assert_eq!(parse_command("  status ").unwrap(), Some(Command::Status));
        assert_eq!(parse_command("side tails").unwrap(), Some(Command::Side(Side::Tail)));
        assert_eq!(
            parse_command("currency se").unwrap(),
            Some(Command::Currency(CurrencyCode::Se))
        );
        assert_eq!(parse_command("QUIT").unwrap(), Some(Command::Quit));
    }

    #[test]
    fn test_parse_flip_variants() {
        assert_eq!(
            parse_command("flip").unwrap(),
            Some(Command::Flip { amount: None, side: None })
        );
        assert_eq!(
            parse_command("flip head").unwrap(),
            Some(Command::Flip { amount: None, side: Some(Side::Head) })
        );
        assert_eq!(
            parse_command("flip 25").unwrap(),
            Some(Command::Flip { amount: Some("25".into()), side: None })
        );
        assert_eq!(
            parse_command("flip 25 t").unwrap(),
            Some(Command::Flip { amount: Some("25".into()), side: Some(Side::Tail) })
        );
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        assert!(parse_command("side edge").is_err());
        assert!(parse_command("currency XX").is_err());
        assert!(parse_command("dance").is_err());
        assert!(parse_command("register a b").is_err());
    }

    #[test]
    fn test_parse_account_commands() {
        assert_eq!(
            parse_command("forgot a@b.co").unwrap(),
            Some(Command::Forgot("a@b.co".into()))
        );
        assert_eq!(parse_command("resend").unwrap(), Some(Command::Resend));
        assert_eq!(parse_command("verify 1234").unwrap(), Some(Command::Verify("1234".into())));
        assert_eq!(
            parse_command("reset newpass1 newpass1").unwrap(),
            Some(Command::Reset { password: "newpass1".into(), confirm: "newpass1".into() })
        );
        assert!(parse_command("reset onlyone").is_err());
    }

    #[test]
    fn test_parse_withdraw_expands_underscores() {
        let Some(Command::Withdraw(form)) =
            parse_command("withdraw A_Player State_Bank SBIN0001234 000111 000111").unwrap()
        else {
            panic!("expected withdraw command");
        };
        assert_eq!(form.name, "A Player");
        assert_eq!(form.bank, "State Bank");
        assert_eq!(form.ifsc, "SBIN0001234");
        assert!(form.validate().is_ok());
        assert!(parse_command("withdraw A_Player").is_err());
    }

    #[test]
    fn test_parse_deposit_commands() {
        assert_eq!(parse_command("deposit").unwrap(), Some(Command::DepositInfo));
        assert_eq!(
            parse_command("deposit attach proof.png").unwrap(),
            Some(Command::DepositAttach("proof.png".into()))
        );
        assert_eq!(parse_command("deposit submit").unwrap(), Some(Command::DepositSubmit));
        assert!(parse_command("deposit refund").is_err());
    }

    #[test]
    fn test_startup_installs_logging_before_config() {
        let cfg = startup("/tmp/coinflip_startup_missing_config.toml").unwrap();
        assert!(tracing::dispatcher::has_been_set());
        assert_eq!(cfg.game.settlement_delay_ms, 1000);
    }

    #[test]
    fn test_capitalise() {
        assert_eq!(capitalise("below minimum"), "Below minimum");
        assert_eq!(capitalise(""), "");
    }
}
