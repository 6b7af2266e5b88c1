/// Receiver side of a channel subscription; see `wire_handler`.
pub trait EventHandler<T> {
    fn handle_event(&mut self, event: &T);
}
