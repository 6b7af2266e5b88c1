// implemented by types whose subscriptions hold an Rc back to themselves; the cycle has to be broken by hand
pub trait Destroyable {
    fn destroy(&mut self);
}
