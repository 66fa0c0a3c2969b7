/// Sentinel value stored against every key of a [`TreeSet`], which is
/// a ``TreeTable<K, Empty>`` underneath.
///
/// [`TreeSet`]: crate::TreeSet
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, PartialOrd, Ord)]
pub struct Empty {}
