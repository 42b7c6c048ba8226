// SPDX-FileCopyrightText: 2026 Ticketline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Ticket administration commands: `tickets`, `departments`, `users`.

use std::io::IsTerminal;

use colored::{ColoredString, Colorize};
use ticketline_config::model::TicketlineConfig;
use ticketline_core::types::{StatusChange, TicketMessage};
use ticketline_core::{StorageAdapter, Ticket, TicketStatus, TicketlineError};
use ticketline_storage::SqliteStorage;

use crate::TicketsCommand;

const ISSUE_COLUMN: usize = 40;

async fn open_storage(config: &TicketlineConfig) -> Result<SqliteStorage, TicketlineError> {
    let storage = SqliteStorage::new(config.storage.clone());
    storage.initialize().await?;
    Ok(storage)
}

fn configure_color(plain: bool) {
    if plain || !std::io::stdout().is_terminal() {
        colored::control::set_override(false);
    }
}

fn status_label(status: TicketStatus) -> ColoredString {
    let text = status.as_ref();
    match status {
        TicketStatus::Open => text.green(),
        TicketStatus::InProgress => text.yellow(),
        TicketStatus::Resolved => text.blue(),
        TicketStatus::Closed => text.dimmed(),
    }
}

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let mut out: String = text.chars().take(max.saturating_sub(1)).collect();
    out.push('…');
    out
}

fn ticket_row(ticket: &Ticket) -> String {
    format!(
        "{:>6}  {:<12} {:<7} {:<18} {:<15} {}",
        format!("#{}", ticket.id),
        status_label(ticket.status),
        ticket.priority.as_ref(),
        truncate(&ticket.creator_department, 18),
        ticket.creator_phone,
        truncate(&ticket.issue, ISSUE_COLUMN),
    )
}

/// Runs a `ticketline tickets` subcommand.
pub async fn run_tickets(
    config: &TicketlineConfig,
    action: TicketsCommand,
    plain: bool,
) -> Result<(), TicketlineError> {
    configure_color(plain);
    let storage = open_storage(config).await?;

    match action {
        TicketsCommand::List { status, limit } => {
            let tickets = storage.tickets_by_status(status, limit).await?;
            if tickets.is_empty() {
                println!("  no tickets");
            } else {
                println!(
                    "{}",
                    format!(
                        "{:>6}  {:<12} {:<7} {:<18} {:<15} {}",
                        "ID", "STATUS", "PRIO", "DEPARTMENT", "PHONE", "ISSUE"
                    )
                    .bold()
                );
                for ticket in &tickets {
                    println!("{}", ticket_row(ticket));
                }
            }
        }
        TicketsCommand::Show { id } => {
            let ticket = storage
                .get_ticket(id)
                .await?
                .ok_or_else(|| TicketlineError::NotFound {
                    entity: "ticket",
                    id: id.to_string(),
                })?;
            let messages = storage.ticket_messages(id).await?;
            let history = storage.status_history(id).await?;
            print_ticket(&ticket, &messages, &history);
        }
        TicketsCommand::Status { id, status, by } => {
            let old = storage.update_ticket_status(id, status, by).await?;
            if old == status {
                println!("  ticket #{id} already {}", status_label(status));
            } else {
                println!(
                    "  ticket #{id}: {} -> {}",
                    status_label(old),
                    status_label(status)
                );
            }
        }
        TicketsCommand::Assign { id, user_id } => {
            storage.assign_ticket(id, user_id).await?;
            println!("  ticket #{id} assigned to user {user_id}");
        }
        TicketsCommand::Stats { phone } => {
            let stats = storage.ticket_stats_for_phone(&phone).await?;
            println!("  {}", phone.bold());
            println!("    total        {}", stats.total);
            println!("    open         {}", stats.open);
            println!("    in_progress  {}", stats.in_progress);
            println!("    resolved     {}", stats.resolved);
            println!("    closed       {}", stats.closed);
        }
    }

    storage.close().await
}

fn print_ticket(ticket: &Ticket, messages: &[TicketMessage], history: &[StatusChange]) {
    println!();
    println!("  {} {}", format!("#{}", ticket.id).bold(), ticket.issue.bold());
    println!("  {}", "-".repeat(50));
    println!("    status      {}", status_label(ticket.status));
    println!("    priority    {}", ticket.priority.as_ref());
    println!("    department  {}", ticket.creator_department);
    println!("    phone       {}", ticket.creator_phone);
    println!(
        "    assignee    {}",
        ticket
            .assigned_user_name
            .as_deref()
            .or(ticket.assigned_to.map(|_| "(unnamed)"))
            .unwrap_or("-")
    );
    println!("    created     {}", ticket.created_at);
    println!("    updated     {}", ticket.updated_at);

    if !messages.is_empty() {
        println!();
        println!("  {}", "Thread".bold());
        for msg in messages {
            println!(
                "    [{}] {} ({}):",
                msg.created_at,
                msg.sender_phone,
                msg.sender_type.as_ref()
            );
            for line in msg.message.lines() {
                println!("      {line}");
            }
        }
    }

    if !history.is_empty() {
        println!();
        println!("  {}", "History".bold());
        for change in history {
            let from = change
                .old_status
                .map(status_label)
                .unwrap_or_else(|| "-".normal());
            println!(
                "    [{}] {} -> {}",
                change.created_at,
                from,
                status_label(change.new_status)
            );
        }
    }
    println!();
}

/// Runs `ticketline departments`.
pub async fn run_departments(config: &TicketlineConfig, plain: bool) -> Result<(), TicketlineError> {
    configure_color(plain);
    let storage = open_storage(config).await?;
    let departments = storage.list_departments().await?;
    for (i, dept) in departments.iter().enumerate() {
        println!("  {}. {} {}", i + 1, dept.name.bold(), format!("(id {})", dept.id).dimmed());
    }
    storage.close().await
}

/// Runs `ticketline users add`.
pub async fn run_add_user(
    config: &TicketlineConfig,
    email: &str,
    name: Option<&str>,
    role: &str,
) -> Result<(), TicketlineError> {
    let storage = open_storage(config).await?;
    let id = storage.create_user(name, email, role).await?;
    println!("  created user {id} ({email}, {role})");
    storage.close().await
}
