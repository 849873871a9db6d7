use std::sync::Arc;

/// A source of IP set membership.
///
/// Members are IP addresses or CIDRs in string form. `None` indicates that
/// the source does not know the set at all, which is distinct from a known
/// set with no members.
pub trait IpSetSource {
    fn ip_set_members(&self, id: &str) -> Option<Vec<String>>;
}

impl<S: IpSetSource + ?Sized> IpSetSource for Arc<S> {
    fn ip_set_members(&self, id: &str) -> Option<Vec<String>> {
        (**self).ip_set_members(id)
    }
}

impl<S: IpSetSource + ?Sized> IpSetSource for Box<S> {
    fn ip_set_members(&self, id: &str) -> Option<Vec<String>> {
        (**self).ip_set_members(id)
    }
}
