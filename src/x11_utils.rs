use anyhow::{Context, Result};
use tracing::debug;
use x11rb::connection::Connection;
use x11rb::protocol::xproto::*;
use x11rb::rust_connection::RustConnection;

use crate::constants::gamescope;

/// Pre-cached X11 atoms to avoid repeated roundtrips
pub struct CachedAtoms {
    pub hdr_output_feedback: Atom,
}

impl CachedAtoms {
    pub fn new(conn: &RustConnection) -> Result<Self> {
        Ok(Self {
            hdr_output_feedback: conn
                .intern_atom(false, gamescope::HDR_FEEDBACK_PROPERTY.as_bytes())
                .context("Failed to intern GAMESCOPE_HDR_OUTPUT_FEEDBACK atom")?
                .reply()
                .context("Failed to get reply for GAMESCOPE_HDR_OUTPUT_FEEDBACK atom")?
                .atom,
        })
    }
}

/// Read-only view of the compositor's root window properties
pub struct RootWindow {
    conn: RustConnection,
    root: Window,
    atoms: CachedAtoms,
}

impl RootWindow {
    pub fn connect(display_name: &str) -> Result<Self> {
        let (conn, screen_num) = x11rb::connect(Some(display_name))
            .with_context(|| format!("Failed to connect to X11 display {display_name}"))?;
        let root = conn.setup().roots[screen_num].root;
        let atoms = CachedAtoms::new(&conn).context("Failed to cache X11 atoms")?;
        debug!(display = %display_name, root = root, "Connected to root window");
        Ok(Self { conn, root, atoms })
    }

    /// Whether the compositor reports an HDR capable output.
    /// `None` when the property has never been set.
    pub fn hdr_output_feedback(&self) -> Result<Option<bool>> {
        let prop = self
            .conn
            .get_property(false, self.root, self.atoms.hdr_output_feedback, AtomEnum::CARDINAL, 0, 1)
            .context("Failed to query GAMESCOPE_HDR_OUTPUT_FEEDBACK property")?
            .reply()
            .context("Failed to get reply for GAMESCOPE_HDR_OUTPUT_FEEDBACK query")?;
        Ok(prop.value32().and_then(|mut values| values.next()).map(|v| v != 0))
    }
}
