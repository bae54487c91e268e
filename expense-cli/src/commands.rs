use eyre::{Result, WrapErr};
use expense_core::api::{RegisterRequest, TransactionFilter};
use expense_core::{ExplorerError, ExpenseClient};
use serde::Serialize;
use serde_json::{json, Value};

use crate::{Command, StatementsCommand};

fn to_json(value: &impl Serialize) -> Result<Value> {
    Ok(serde_json::to_value(value)?)
}

/// Points the user at `expense login` when the stored session is gone.
fn reauthenticate_hint<T>(result: Result<T, ExplorerError>) -> Result<T> {
    result.map_err(|error| {
        if error.must_reauthenticate() {
            eyre::Report::new(error).wrap_err("session ended, run `expense login` again")
        } else {
            eyre::Report::new(error)
        }
    })
}

/// Executes one subcommand and returns what should be printed.
pub async fn run(client: &ExpenseClient, command: Command) -> Result<Value> {
    match command {
        Command::Login { email, password } => {
            let user = client.auth().login(&email, &password).await?;
            if let Some(user) = &user {
                tracing::info!(user = user.id, "signed in");
            }
            Ok(json!({
                "state": format!("{:?}", client.session().state()),
                "user": user,
            }))
        }
        Command::Register {
            email,
            username,
            password,
            confirm_password,
            first_name,
            last_name,
        } => {
            let form = RegisterRequest {
                email,
                username,
                password2: confirm_password.unwrap_or_else(|| password.clone()),
                password,
                first_name,
                last_name,
            };
            to_json(&client.auth().register_and_login(&form).await?)
        }
        Command::Logout => {
            let state = client.auth().logout()?;
            Ok(json!({ "state": format!("{state:?}") }))
        }
        Command::Status => Ok(json!({
            "state": format!("{:?}", client.session().state()),
            "authenticated": client.tokens().is_authenticated(),
            "has_refresh_token": client.tokens().refresh_token()?.is_some(),
        })),
        Command::Profile => to_json(&reauthenticate_hint(client.auth().profile().await)?),
        Command::ResetPassword { email } => {
            to_json(&client.auth().request_password_reset(&email).await?)
        }
        Command::ConfirmReset { token, password } => {
            to_json(&client.auth().confirm_password_reset(&token, &password).await?)
        }
        Command::Statements(command) => statements(client, command).await,
        Command::Upload {
            path,
            currency,
            show,
        } => {
            let result = reauthenticate_hint(client.statements().upload(&path, currency).await)
                .wrap_err_with(|| format!("upload of {} failed", path.display()))?;
            if !show {
                return to_json(&result);
            }
            let change =
                reauthenticate_hint(client.dashboard_controller().show_uploaded(&result).await)?;
            Ok(json!({ "upload": result, "statements": change.statements, "dashboard": change.state }))
        }
        Command::Transactions {
            statement,
            category,
            from,
            to,
        } => {
            let filter = TransactionFilter {
                statement_id: statement,
                category_id: category,
                start_date: from,
                end_date: to,
            };
            to_json(&reauthenticate_hint(client.transactions().list(&filter).await)?)
        }
        Command::Categories => to_json(&reauthenticate_hint(client.categories().list().await)?),
        Command::Dashboard {
            statement,
            category,
        } => {
            let controller = client.dashboard_controller();
            match statement {
                Some(id) => {
                    reauthenticate_hint(controller.load(Some(id)).await)?;
                }
                None => {
                    reauthenticate_hint(controller.initialize().await)?;
                }
            }
            if category.is_some() {
                reauthenticate_hint(controller.select_category(category).await)?;
            }
            to_json(&controller.state())
        }
    }
}

async fn statements(client: &ExpenseClient, command: StatementsCommand) -> Result<Value> {
    let api = client.statements();
    match command {
        StatementsCommand::List => to_json(&reauthenticate_hint(api.list().await)?),
        StatementsCommand::Show { id } => to_json(&reauthenticate_hint(api.get(id).await)?),
        StatementsCommand::Delete { id } => {
            let change =
                reauthenticate_hint(client.dashboard_controller().delete_statement(id).await)?;
            Ok(json!({ "deleted": id, "remaining": change.statements }))
        }
    }
}
