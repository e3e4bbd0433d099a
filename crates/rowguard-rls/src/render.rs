//! The rendering capability shared by values, conditions and subqueries.

use rowguard_core::DialectConfig;

use crate::error::RlsError;

/// Anything that can render itself to a SQL fragment.
///
/// The escaper renders any [`RenderSql`] value verbatim, unquoted.
pub trait RenderSql {
    /// Render using the given dialect configuration.
    fn render_sql(&self, dialect: &DialectConfig) -> Result<String, RlsError>;

    /// Render using the default PostgreSQL configuration.
    fn to_sql(&self) -> Result<String, RlsError> {
        self.render_sql(&DialectConfig::default())
    }
}
