//! Purpose: Model the values plain JSON cannot carry and the datastore handles behind them.
//! Exports: `RichValue`, `AsAny`, `Model`, `EntityKey`, `KeyId`, `Deferred`, `Query`,
//! `QueryIterator`, `Complex`, `StructTime`, `BaseValue`, `eq_by_value`.
//! Role: Seam between the codec and the external data-access layer.
//! Invariants: Collaborator handles are inspected and resolved, never persisted or mutated.
//! Invariants: `QueryIterator` is one-shot; once drained it yields an empty sequence.
use crate::core::error::{Error, ErrorKind};
use crate::core::value::{Map, Value};
use std::any::{Any, TypeId};
use std::fmt;
use std::sync::{Arc, Mutex};
use time::{Date, OffsetDateTime, PrimitiveDateTime};

pub trait AsAny: Any {
    fn as_any(&self) -> &dyn Any;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// A value the JSON grammar cannot represent natively.
///
/// The encoder looks a rich value up by its concrete type first; when that
/// misses it asks the value, in registry order, whether it is an instance of
/// each registered type. Types that stand in for another (a custom date-time
/// wrapper, say) override [`RichValue::instance_of`] to hand out a view of
/// the base value.
pub trait RichValue: AsAny + fmt::Debug + Send + Sync + 'static {
    fn type_name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    fn instance_of(&self, ty: TypeId) -> Option<&dyn Any> {
        let any = AsAny::as_any(self);
        (Any::type_id(any) == ty).then_some(any)
    }

    /// Identity comparison unless the type knows better.
    fn rich_eq(&self, other: &dyn RichValue) -> bool {
        std::ptr::addr_eq(self as *const Self, other as *const dyn RichValue)
    }
}

impl dyn RichValue {
    pub fn concrete_type_id(&self) -> TypeId {
        Any::type_id(AsAny::as_any(self))
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        AsAny::as_any(self).downcast_ref::<T>()
    }
}

pub fn eq_by_value<T: PartialEq + Any>(this: &T, other: &dyn RichValue) -> bool {
    other.downcast_ref::<T>().is_some_and(|other| other == this)
}

/// One stored record, convertible to a plain mapping.
pub trait Model: fmt::Debug + Send + Sync {
    fn to_dict(&self) -> Result<Map, Error>;
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum KeyId {
    Id(i64),
    Name(String),
}

impl From<KeyId> for Value {
    fn from(id: KeyId) -> Self {
        match id {
            KeyId::Id(id) => Value::Int(id.into()),
            KeyId::Name(name) => Value::String(name),
        }
    }
}

/// Addressable pointer to a stored entity.
pub trait EntityKey: fmt::Debug + Send + Sync {
    /// Starts fetching the addressed entity. Implementations usually return a
    /// [`Value::deferred`] handle, but an already loaded entity is fine too.
    fn get_async(&self) -> Result<Value, Error>;

    /// `(kind, id)` pairs from the root ancestor down to this key.
    fn pairs(&self) -> Vec<(String, KeyId)>;

    fn urlsafe(&self) -> String;
}

/// A pending datastore result. `get_result` blocks until it completes.
pub trait Deferred: fmt::Debug + Send + Sync {
    fn get_result(&self) -> Result<Value, Error>;
}

/// A query that can be run to completion. Each `fetch` runs it again.
pub trait Query: fmt::Debug + Send + Sync {
    fn fetch(&self) -> Result<Vec<Value>, Error>;
}

impl RichValue for Arc<dyn Model> {
    fn type_name(&self) -> &'static str {
        "Model"
    }
}

impl RichValue for Arc<dyn EntityKey> {
    fn type_name(&self) -> &'static str {
        "Key"
    }
}

impl RichValue for Arc<dyn Deferred> {
    fn type_name(&self) -> &'static str {
        "Future"
    }
}

impl RichValue for Arc<dyn Query> {
    fn type_name(&self) -> &'static str {
        "Query"
    }
}

type ResultIter = Box<dyn Iterator<Item = Result<Value, Error>> + Send>;

/// Cursor over query results (or any generator of values). Encoding it
/// consumes it: the first encode yields every remaining item, later encodes
/// of the same handle yield `[]`.
pub struct QueryIterator {
    inner: Mutex<ResultIter>,
}

impl QueryIterator {
    pub fn new<I>(results: I) -> Self
    where
        I: IntoIterator<Item = Result<Value, Error>>,
        I::IntoIter: Send + 'static,
    {
        Self {
            inner: Mutex::new(Box::new(results.into_iter())),
        }
    }

    pub fn from_values<I>(values: I) -> Self
    where
        I: IntoIterator<Item = Value>,
        I::IntoIter: Send + 'static,
    {
        Self::new(values.into_iter().map(Ok))
    }

    pub fn drain(&self) -> Result<Vec<Value>, Error> {
        let mut inner = self.inner.lock().map_err(|_| {
            Error::new(ErrorKind::Internal).with_message("query iterator lock poisoned")
        })?;
        inner.by_ref().collect()
    }
}

impl fmt::Debug for QueryIterator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryIterator").finish_non_exhaustive()
    }
}

impl RichValue for QueryIterator {
    fn type_name(&self) -> &'static str {
        "QueryIterator"
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Complex {
    pub re: f64,
    pub im: f64,
}

impl Complex {
    pub fn new(re: f64, im: f64) -> Self {
        Self { re, im }
    }
}

impl RichValue for Complex {
    fn type_name(&self) -> &'static str {
        "Complex"
    }

    fn rich_eq(&self, other: &dyn RichValue) -> bool {
        eq_by_value(self, other)
    }
}

/// Broken-down time in the classic nine-field layout.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct StructTime {
    pub year: i32,
    pub month: u8,
    pub day: u8,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
    /// Monday is 0.
    pub weekday: u8,
    /// January 1st is 1.
    pub yearday: u16,
    /// -1 when unknown.
    pub isdst: i8,
}

impl StructTime {
    /// Breaks a UTC date-time down; DST is never in effect for UTC.
    pub fn from_utc(datetime: PrimitiveDateTime) -> Self {
        Self {
            year: datetime.year(),
            month: datetime.month().into(),
            day: datetime.day(),
            hour: datetime.hour(),
            minute: datetime.minute(),
            second: datetime.second(),
            weekday: datetime.weekday().number_days_from_monday(),
            yearday: datetime.ordinal(),
            isdst: 0,
        }
    }

    pub fn fields(&self) -> [i64; 9] {
        [
            self.year.into(),
            self.month.into(),
            self.day.into(),
            self.hour.into(),
            self.minute.into(),
            self.second.into(),
            self.weekday.into(),
            self.yearday.into(),
            self.isdst.into(),
        ]
    }
}

impl RichValue for StructTime {
    fn type_name(&self) -> &'static str {
        "StructTime"
    }

    fn rich_eq(&self, other: &dyn RichValue) -> bool {
        eq_by_value(self, other)
    }
}

/// A raw datastore value still wrapped in its storage envelope.
#[derive(Clone, Debug, PartialEq)]
pub struct BaseValue(pub Value);

impl RichValue for BaseValue {
    fn type_name(&self) -> &'static str {
        "BaseValue"
    }

    fn rich_eq(&self, other: &dyn RichValue) -> bool {
        eq_by_value(self, other)
    }
}

impl RichValue for Date {
    fn type_name(&self) -> &'static str {
        "Date"
    }

    fn rich_eq(&self, other: &dyn RichValue) -> bool {
        eq_by_value(self, other)
    }
}

impl RichValue for PrimitiveDateTime {
    fn type_name(&self) -> &'static str {
        "DateTime"
    }

    fn rich_eq(&self, other: &dyn RichValue) -> bool {
        eq_by_value(self, other)
    }
}

impl RichValue for OffsetDateTime {
    fn type_name(&self) -> &'static str {
        "OffsetDateTime"
    }

    fn rich_eq(&self, other: &dyn RichValue) -> bool {
        eq_by_value(self, other)
    }
}

#[cfg(test)]
mod tests {
    use super::{Complex, QueryIterator, RichValue, StructTime};
    use crate::core::value::Value;
    use std::any::TypeId;
    use time::macros::datetime;
    use time::PrimitiveDateTime;

    #[test]
    fn query_iterator_is_one_shot() {
        let iter = QueryIterator::from_values(vec![Value::from(1), Value::from(2)]);
        assert_eq!(iter.drain().expect("first drain").len(), 2);
        assert!(iter.drain().expect("second drain").is_empty());
    }

    #[test]
    fn default_instance_of_matches_only_the_concrete_type() {
        let value = Complex::new(1.0, -2.0);
        assert!(value.instance_of(TypeId::of::<Complex>()).is_some());
        assert!(value.instance_of(TypeId::of::<PrimitiveDateTime>()).is_none());
    }

    #[test]
    fn struct_time_breaks_down_utc() {
        let tm = StructTime::from_utc(datetime!(2015-03-02 4:05:06));
        // 2015-03-02 was a Monday, day 61 of a non-leap year.
        assert_eq!(tm.fields(), [2015, 3, 2, 4, 5, 6, 0, 61, 0]);
    }

    #[test]
    fn rich_equality_is_by_value_for_plain_data() {
        let a = Value::rich(datetime!(2016-01-01 12:00));
        let b = Value::rich(datetime!(2016-01-01 12:00));
        assert_eq!(a, b);
        assert_ne!(a, Value::rich(Complex::new(0.0, 0.0)));
    }
}
