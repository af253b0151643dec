//! Sign-in and sign-out.

use orebi_core::UserId;
use orebi_storefront::session::{Session, UserProfile};
use secrecy::SecretString;

use super::Shop;
use crate::{CliResult, output};

/// Store a backend-issued token as the current session and pull the user's
/// server cart.
pub async fn login(
    shop: &Shop,
    token: String,
    user_id: String,
    username: String,
    roles: Vec<String>,
    permissions: Vec<String>,
) -> CliResult {
    let mut session = Session::new(
        SecretString::from(token),
        UserProfile {
            id: UserId::new(user_id),
            username,
            roles,
        },
    );
    session.permissions = permissions;

    if !session.is_fresh() {
        return Err("Token has already expired".into());
    }

    shop.sign_in(session.clone())?;
    let snapshot = shop
        .cart()
        .fetch_cart(session.user_id(), &session.token)
        .await?;
    shop.persist()?;

    output::line(&format!("Signed in as {}", session.user.username));
    output::cart(&snapshot);
    Ok(())
}

/// Forget the session and local cart.
pub fn logout(shop: &Shop) -> CliResult {
    shop.sign_out()?;
    output::line("Signed out");
    Ok(())
}
