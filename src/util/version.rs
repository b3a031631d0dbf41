pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

pub fn version_label() -> String {
    format!("v{APP_VERSION}")
}

/// User agent sent with every courier API request.
pub fn user_agent() -> String {
    format!("awb-console/{APP_VERSION}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_carry_the_package_version() {
        assert_eq!(version_label(), format!("v{}", env!("CARGO_PKG_VERSION")));
        assert!(user_agent().starts_with("awb-console/"));
    }
}
