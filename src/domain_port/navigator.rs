/// Client-side navigation, used to send the user back to sign-in when the
/// session can no longer be used.
pub trait Navigator: Send + Sync {
    fn navigate(&self, to: &str);
}
