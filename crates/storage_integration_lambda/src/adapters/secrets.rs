pub trait SecretSource {
    /// Returns the secret's string payload.
    fn get_secret(&self, name: &str) -> Result<String, String>;
}
