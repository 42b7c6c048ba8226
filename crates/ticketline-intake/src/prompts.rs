// SPDX-FileCopyrightText: 2026 Ticketline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! User-facing reply texts.
//!
//! Formatting uses WhatsApp markup: `*bold*` and `_italic_`.

use ticketline_core::types::Ticket;

pub fn department_menu(departments: &[String]) -> String {
    let mut text = String::from(
        "Welcome to the help desk! Which department is your request for?\n\n",
    );
    push_menu(&mut text, departments);
    text.push_str("\nReply with the number of the department.");
    text
}

pub fn invalid_department(departments: &[String]) -> String {
    let mut text = format!(
        "Sorry, that is not a valid choice. Please reply with a number from 1 to {}:\n\n",
        departments.len()
    );
    push_menu(&mut text, departments);
    text
}

fn push_menu(text: &mut String, departments: &[String]) {
    for (i, name) in departments.iter().enumerate() {
        text.push_str(&format!("{}. {name}\n", i + 1));
    }
}

/// Sent once the department is known, either freshly chosen or remembered.
pub fn issue_title_prompt(department: &str, returning: bool) -> String {
    if returning {
        format!(
            "Welcome back! Your request will go to *{department}*.\n\n\
             Please send a short, one-line title for your issue."
        )
    } else {
        format!(
            "Thanks! Your request will go to *{department}*.\n\n\
             Please send a short, one-line title for your issue."
        )
    }
}

pub fn issue_title_too_short(min: usize) -> String {
    format!("That title is too short. Please describe the issue in at least {min} characters.")
}

pub fn issue_title_too_long(max: usize, len: usize) -> String {
    format!(
        "That title is {len} characters long. Please keep it to {max} characters or fewer; \
         you can add details later."
    )
}

pub fn ticket_created(ticket_id: i64, department: &str) -> String {
    format!(
        "Your ticket *#{ticket_id}* has been created for *{department}*. \
         Our team will get back to you soon."
    )
}

/// Acknowledgment when persistence is disabled and no ticket number exists.
pub fn request_received() -> String {
    "Thanks, your request has been received. Our team will get back to you soon.".to_string()
}

pub fn ticket_decision(tickets: &[Ticket]) -> String {
    let mut text = if tickets.len() == 1 {
        String::from("You have an open ticket:\n\n")
    } else {
        format!("You have {} open tickets:\n\n", tickets.len())
    };
    for ticket in tickets {
        text.push_str(&format!(
            "• *#{}* {} _({})_\n",
            ticket.id, ticket.issue, ticket.status
        ));
    }
    text.push_str("\nReply *1* to add to an existing ticket or *2* to open a new one.");
    text
}

pub fn invalid_decision() -> String {
    "Please reply *1* to add to an existing ticket or *2* to open a new one.".to_string()
}

pub fn ticket_selection(tickets: &[Ticket]) -> String {
    let mut text = String::from("Which ticket would you like to update?\n\n");
    push_ticket_list(&mut text, tickets);
    text.push_str("\nReply with the number of the ticket.");
    text
}

pub fn invalid_selection(tickets: &[Ticket]) -> String {
    let mut text = format!(
        "Please reply with a number from 1 to {}:\n\n",
        tickets.len()
    );
    push_ticket_list(&mut text, tickets);
    text
}

fn push_ticket_list(text: &mut String, tickets: &[Ticket]) {
    for (i, ticket) in tickets.iter().enumerate() {
        text.push_str(&format!("{}. *#{}* {}\n", i + 1, ticket.id, ticket.issue));
    }
}

pub fn update_prompt(ticket: &Ticket) -> String {
    format!(
        "What would you like to add to ticket *#{}* ({})?",
        ticket.id, ticket.issue
    )
}

pub fn update_too_short(min: usize) -> String {
    format!("That update is too short. Please write at least {min} characters.")
}

pub fn update_too_long(max: usize, len: usize) -> String {
    format!(
        "That update is {len} characters long. Please keep it to {max} characters or fewer, \
         or split it into several messages."
    )
}

pub fn update_appended(ticket_id: i64) -> String {
    format!("Your message has been added to ticket *#{ticket_id}*. Thank you!")
}

pub fn apology() -> String {
    "Sorry, something went wrong on our side and your request could not be processed. \
     Please send your message again in a few minutes."
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ticketline_config::model::default_departments;

    #[test]
    fn menu_numbers_departments_from_one() {
        let menu = department_menu(&default_departments());
        assert!(menu.contains("1. Human Resources\n"));
        assert!(menu.contains("5. Editing\n"));
    }

    #[test]
    fn invalid_department_repeats_full_menu() {
        let text = invalid_department(&default_departments());
        for (i, name) in default_departments().iter().enumerate() {
            assert!(text.contains(&format!("{}. {name}", i + 1)));
        }
    }

    #[test]
    fn ticket_created_mentions_number() {
        assert!(ticket_created(42, "Finance").contains("#42"));
    }
}
