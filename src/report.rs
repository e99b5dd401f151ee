use std::io::{self, Write};

use crate::distance::Profile;

pub const HEADER: &str = "address reuse-distance stack-distance stack-distance-est";

/// One line per access: line index in hex, then the three forward distances.
pub fn write_report(out: &mut impl Write, stream: &[u64], profile: &Profile) -> io::Result<()> {
    writeln!(out, "{HEADER}")?;
    for (i, address) in stream.iter().enumerate() {
        writeln!(
            out,
            "{:x} {} {} {}",
            address, profile.reuse[i], profile.stack[i], profile.stack_est[i]
        )?;
    }
    Ok(())
}
