// SPDX-FileCopyrightText: 2026 Ticketline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Ticketline - chat ticket intake.
//!
//! This is the binary entry point: the intake service plus the
//! administration commands that work directly on the ticket database.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

mod bridge;
mod doctor;
mod serve;
mod tickets;

use clap::{Parser, Subcommand};
use ticketline_core::TicketStatus;

/// Ticketline - turn chat conversations into support tickets.
#[derive(Parser, Debug)]
#[command(name = "ticketline", version, about, long_about = None)]
struct Cli {
    /// Disable colored output.
    #[arg(long, global = true)]
    plain: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the intake service on the stdio bridge.
    Serve,
    /// Inspect and manage tickets.
    Tickets {
        #[command(subcommand)]
        action: TicketsCommand,
    },
    /// List the department catalog.
    Departments,
    /// Manage staff tickets can be assigned to.
    Users {
        #[command(subcommand)]
        action: UsersCommand,
    },
    /// Run diagnostic checks.
    Doctor {
        /// Also run integrity and memory checks.
        #[arg(long)]
        deep: bool,
    },
}

#[derive(Subcommand, Debug)]
enum TicketsCommand {
    /// List the newest tickets.
    List {
        #[arg(long)]
        status: Option<TicketStatus>,
        #[arg(long, default_value_t = 20)]
        limit: i64,
    },
    /// Show a ticket with its thread and status history.
    Show { id: i64 },
    /// Change a ticket's status.
    Status {
        id: i64,
        status: TicketStatus,
        /// User id recorded in the status log.
        #[arg(long)]
        by: Option<i64>,
    },
    /// Assign a ticket to a user.
    Assign { id: i64, user_id: i64 },
    /// Ticket counts for a phone number.
    Stats { phone: String },
}

#[derive(Subcommand, Debug)]
enum UsersCommand {
    /// Create a user.
    Add {
        email: String,
        #[arg(long)]
        name: Option<String>,
        /// One of admin, manager, creator, worker.
        #[arg(long, default_value = "worker")]
        role: String,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match ticketline_config::load_and_validate() {
        Ok(config) => config,
        Err(errors) => {
            ticketline_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    let result = match cli.command {
        Some(Commands::Serve) => serve::run_serve(config).await,
        Some(Commands::Tickets { action }) => {
            tickets::run_tickets(&config, action, cli.plain).await
        }
        Some(Commands::Departments) => tickets::run_departments(&config, cli.plain).await,
        Some(Commands::Users {
            action: UsersCommand::Add { email, name, role },
        }) => tickets::run_add_user(&config, &email, name.as_deref(), &role).await,
        Some(Commands::Doctor { deep }) => doctor::run_doctor(&config, deep, cli.plain).await,
        None => {
            println!("ticketline: use --help for available commands");
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[cfg(not(target_env = "msvc"))]
    fn jemalloc_is_active() {
        // Only jemalloc supports advancing the epoch.
        use tikv_jemalloc_ctl::{epoch, stats};
        epoch::advance().unwrap();
        let allocated = stats::allocated::read().unwrap();
        assert!(allocated > 0, "jemalloc should report non-zero allocation");
    }

    #[test]
    fn cli_parses_ticket_status_change() {
        let cli = Cli::try_parse_from([
            "ticketline",
            "tickets",
            "status",
            "42",
            "in_progress",
            "--by",
            "3",
        ])
        .unwrap();
        match cli.command {
            Some(Commands::Tickets {
                action: TicketsCommand::Status { id, status, by },
            }) => {
                assert_eq!(id, 42);
                assert_eq!(status, TicketStatus::InProgress);
                assert_eq!(by, Some(3));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn cli_rejects_unknown_status() {
        assert!(Cli::try_parse_from(["ticketline", "tickets", "status", "1", "pending"]).is_err());
    }

    #[test]
    fn cli_list_defaults() {
        let cli = Cli::try_parse_from(["ticketline", "--plain", "tickets", "list"]).unwrap();
        assert!(cli.plain);
        match cli.command {
            Some(Commands::Tickets {
                action: TicketsCommand::List { status, limit },
            }) => {
                assert!(status.is_none());
                assert_eq!(limit, 20);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
