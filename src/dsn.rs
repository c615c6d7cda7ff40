//! Database DSN parsing.
//!
//! Accepts the compact `user[:password]@[net[(addr)]]/dbname[?params]` form
//! and renders the `postgres://` URL sqlx connects with. Unix socket
//! addresses may contain slashes, so the dbname separator is the first `/`
//! outside parentheses.

/// Errors raised while parsing a DSN.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum DsnError {
    #[error("DSN has no '/dbname' segment")]
    MissingDatabase,

    #[error("DSN has no user before '@'")]
    MissingUser,

    #[error("DSN address has unbalanced parentheses")]
    UnbalancedAddress,
}

/// A parsed DSN.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dsn {
    /// User name, always present.
    pub user: String,
    /// Optional password.
    pub password: Option<String>,
    /// Network kind, e.g. `tcp` or `unix`. Empty when the DSN omits it.
    pub net: String,
    /// Address inside the parentheses, when given.
    pub addr: Option<String>,
    /// Database name. May be empty.
    pub dbname: String,
    /// Raw query parameters after `?`, when given.
    pub params: Option<String>,
}

impl Dsn {
    /// Parse a `user[:password]@[net[(addr)]]/dbname[?params]` string.
    pub fn parse(input: &str) -> Result<Self, DsnError> {
        let slash = first_slash_outside_parens(input)?.ok_or(DsnError::MissingDatabase)?;
        let (prefix, rest) = (&input[..slash], &input[slash + 1..]);

        // Passwords may contain '@'; the network part never does, so the
        // split point is the last one.
        let at = prefix.rfind('@').ok_or(DsnError::MissingUser)?;
        let (credentials, hostpart) = (&prefix[..at], &prefix[at + 1..]);
        if credentials.is_empty() {
            return Err(DsnError::MissingUser);
        }
        let (user, password) = match credentials.split_once(':') {
            Some((user, password)) => (user.to_string(), Some(password.to_string())),
            None => (credentials.to_string(), None),
        };

        let (net, addr) = match hostpart.split_once('(') {
            Some((net, rest)) => {
                let addr = rest
                    .strip_suffix(')')
                    .ok_or(DsnError::UnbalancedAddress)?;
                (net.to_string(), Some(addr.to_string()))
            }
            None => (hostpart.to_string(), None),
        };

        let (dbname, params) = match rest.split_once('?') {
            Some((dbname, params)) => (dbname.to_string(), Some(params.to_string())),
            None => (rest.to_string(), None),
        };

        Ok(Self {
            user,
            password,
            net,
            addr,
            dbname,
            params,
        })
    }

    /// Render the URL form sqlx understands.
    pub fn postgres_url(&self) -> String {
        let mut url = String::from("postgres://");
        url.push_str(&self.user);
        if let Some(password) = &self.password {
            url.push(':');
            url.push_str(password);
        }
        url.push('@');
        if let Some(addr) = &self.addr {
            url.push_str(addr);
        }
        url.push('/');
        url.push_str(&self.dbname);
        if let Some(params) = &self.params {
            url.push('?');
            url.push_str(params);
        }
        url
    }
}

/// Index of the first `/` at parenthesis depth zero, so socket paths inside
/// `unix(/var/run/...)` do not terminate the host part early.
fn first_slash_outside_parens(input: &str) -> Result<Option<usize>, DsnError> {
    let mut depth = 0usize;
    for (idx, ch) in input.char_indices() {
        match ch {
            '(' => depth += 1,
            ')' => depth = depth.checked_sub(1).ok_or(DsnError::UnbalancedAddress)?,
            '/' if depth == 0 => return Ok(Some(idx)),
            _ => {}
        }
    }
    if depth != 0 {
        return Err(DsnError::UnbalancedAddress);
    }
    Ok(None)
}
