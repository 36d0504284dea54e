//! `login` and `logout`.

use std::io::{BufRead, Write};

use secrecy::SecretString;
use tracing::instrument;

use super::Context;
use crate::error::CliError;

/// Obtain a token and store it.
///
/// Without `password`, one line is read from stdin.
///
/// # Errors
///
/// Rejected credentials, unreachable backend, or an unwritable token file.
#[instrument(skip(ctx, password, out))]
pub async fn login(
    ctx: &Context,
    username: &str,
    password: Option<String>,
    out: &mut impl Write,
) -> Result<(), CliError> {
    let password = match password {
        Some(p) => p,
        None => read_password()?,
    };
    let password = SecretString::from(password);

    let token = ctx.api.obtain_token(username.trim(), &password).await?;
    ctx.tokens.save(&token)?;
    tracing::info!(path = %ctx.tokens.path().display(), "Token stored");

    writeln!(
        out,
        "Sesión iniciada como {} ({}).",
        token.username(),
        token.role().label()
    )?;
    Ok(())
}

fn read_password() -> Result<String, CliError> {
    let mut stderr = std::io::stderr();
    write!(stderr, "Contraseña: ")?;
    stderr.flush()?;

    let mut line = String::new();
    std::io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim_end_matches(['\r', '\n']).to_owned())
}

/// Delete the stored token.
///
/// # Errors
///
/// The token file exists but cannot be removed.
pub fn logout(ctx: &Context, out: &mut impl Write) -> Result<(), CliError> {
    if ctx.tokens.remove()? {
        writeln!(out, "Sesión cerrada.")?;
    } else {
        writeln!(out, "No había una sesión activa.")?;
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::commands::tests::{context, spawn_backend};

    #[tokio::test]
    async fn test_login_stores_token_and_logout_removes_it() {
        let backend = spawn_backend().await;
        let ctx = context(&backend, "login");

        let mut out = Vec::new();
        login(&ctx, "bodeguero", Some("secreto".to_owned()), &mut out)
            .await
            .unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "Sesión iniciada como bodeguero (Administrador).\n"
        );
        assert!(ctx.tokens.load().unwrap().is_some());

        let mut out = Vec::new();
        logout(&ctx, &mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "Sesión cerrada.\n");
        assert!(ctx.tokens.load().unwrap().is_none());
    }

    #[tokio::test]
    async fn test_wrong_password_stores_nothing() {
        let backend = spawn_backend().await;
        let ctx = context(&backend, "bad-login");

        let err = login(&ctx, "bodeguero", Some("otra".to_owned()), &mut Vec::new())
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Usuario o contraseña incorrectos.");
        assert!(ctx.tokens.load().unwrap().is_none());
    }
}
