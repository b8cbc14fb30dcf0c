use tracing::debug;

use super::TransformContext;
use crate::error::Result;
use crate::extract::DefaultExport;

/// Strip `export default ` off the compiled component function. The
/// function stays in place; the appendix exports the meta instead.
pub(super) fn remove(ctx: &mut TransformContext<'_>, export: &DefaultExport) -> Result<()> {
    ctx.buffer
        .remove(export.range.start, export.declaration_start)?;
    debug!(filename = ctx.filename, "removed default export");
    Ok(())
}
