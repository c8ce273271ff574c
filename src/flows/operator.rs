//! The human on the other side of an interactive grant.

// std
use std::io::{self, BufRead, Write};
// self
use crate::{
	_prelude::*,
	auth::IdentityId,
	error::TransportError,
	flows::DeviceCodePrompt,
};

/// Interaction points of the interactive grant methods.
pub trait Operator: Send + Sync {
	/// Shows the verification URL and user code of a device-authorization request.
	fn present_device_code(&self, identity: &IdentityId, prompt: &DeviceCodePrompt);

	/// Shows `authorize_url` and returns what the operator pasted back (a code or a redirect URL).
	fn authorization_code(&self, identity: &IdentityId, authorize_url: &Url) -> Result<String>;
}

/// Operator backed by the process terminal: prompts on stdout, reads one line from stdin.
#[derive(Clone, Copy, Debug, Default)]
pub struct ConsoleOperator;
impl Operator for ConsoleOperator {
	fn present_device_code(&self, identity: &IdentityId, prompt: &DeviceCodePrompt) {
		let mut out = io::stdout().lock();
		let _ = writeln!(
			out,
			"[{identity}] Visit {} and enter code {} (expires in {} minutes).",
			prompt.verification_url,
			prompt.user_code,
			prompt.expires_in.whole_minutes()
		);
		let _ = out.flush();
	}

	fn authorization_code(&self, identity: &IdentityId, authorize_url: &Url) -> Result<String> {
		{
			let mut out = io::stdout().lock();

			writeln!(out, "[{identity}] Open this URL in a browser and approve access:")
				.and_then(|_| writeln!(out, "{authorize_url}"))
				.and_then(|_| write!(out, "Paste the authorization code or the redirected URL: "))
				.and_then(|_| out.flush())
				.map_err(TransportError::from)?;
		}

		let mut line = String::new();

		io::stdin().lock().read_line(&mut line).map_err(TransportError::from)?;

		Ok(line.trim().to_owned())
	}
}
