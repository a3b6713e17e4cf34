pub fn run() -> anyhow::Result<()> {
    println!("helpdesk {}", env!("CARGO_PKG_VERSION"));
    println!("IT helpdesk assistant with knowledge-base answers and ticket workflow");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_output() {
        let result = run();
        assert!(result.is_ok());
    }
}
