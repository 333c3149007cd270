//! CLI argument definitions.
//!
//! Uses clap derive macros for type-safe argument parsing.

use clap::{Parser, Subcommand};

use domain::{UserId, UserRole, DEFAULT_PAGE_NUMBER, DEFAULT_PAGE_SIZE};

/// User data-access service
#[derive(Parser, Debug)]
#[command(name = "user-service")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Database migration commands
    Migrate {
        #[command(subcommand)]
        action: MigrateAction,
    },
    /// Manage users (prints JSON)
    Users {
        #[command(subcommand)]
        command: UserCommand,
    },
}

/// Migration actions
#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum MigrateAction {
    /// Run pending migrations
    Up,
    /// Rollback last migration
    Down,
    /// Show migration status
    Status,
    /// Reset database and run all migrations
    Fresh,
}

/// User actions
#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum UserCommand {
    /// List one page of users
    List {
        #[arg(long, default_value_t = DEFAULT_PAGE_NUMBER)]
        page: u64,
        #[arg(long, default_value_t = DEFAULT_PAGE_SIZE)]
        page_size: u64,
        /// Only users that are not soft-deleted, newest first
        #[arg(long)]
        active: bool,
        /// Only active users with this role (implies --active)
        #[arg(long, value_parser = parse_role)]
        role: Option<UserRole>,
    },
    /// Show one user
    Get { id: UserId },
    /// Create a user
    Create {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        password_hash: String,
        #[arg(long, value_parser = parse_role)]
        role: Option<UserRole>,
    },
    /// Change the given fields of a user
    Update {
        id: UserId,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        email: Option<String>,
        #[arg(long, value_parser = parse_role)]
        role: Option<UserRole>,
    },
    /// Mark a user as deleted
    SoftDelete { id: UserId },
    /// Clear the deleted mark
    Restore { id: UserId },
    /// Permanently delete a user
    Delete { id: UserId },
    /// Count users
    Count {
        /// Only users that are not soft-deleted
        #[arg(long)]
        active: bool,
    },
}

fn parse_role(value: &str) -> Result<UserRole, domain::DomainError> {
    value.parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn users(args: &[&str]) -> UserCommand {
        let mut argv = vec!["user-service", "users"];
        argv.extend_from_slice(args);
        match Cli::try_parse_from(argv).unwrap().command {
            Commands::Users { command } => command,
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_list_defaults() {
        assert_eq!(
            users(&["list"]),
            UserCommand::List {
                page: 1,
                page_size: 10,
                active: false,
                role: None,
            }
        );
    }

    #[test]
    fn test_role_is_parsed_strictly() {
        assert!(matches!(
            users(&["list", "--role", "admin"]),
            UserCommand::List { role: Some(UserRole::Admin), .. }
        ));
        assert!(Cli::try_parse_from(["user-service", "users", "list", "--role", "root"]).is_err());
    }

    #[test]
    fn test_update_flags() {
        assert_eq!(
            users(&["update", "7", "--name", "Bo"]),
            UserCommand::Update {
                id: 7,
                name: Some("Bo".to_string()),
                email: None,
                role: None,
            }
        );
    }

    #[test]
    fn test_migrate_and_verbose() {
        let cli = Cli::try_parse_from(["user-service", "-v", "migrate", "status"]).unwrap();
        assert!(cli.verbose);
        assert!(matches!(
            cli.command,
            Commands::Migrate {
                action: MigrateAction::Status
            }
        ));
    }
}
