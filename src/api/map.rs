//! Purpose: Present a two-column table as a key/value mapping.
//! Exports: `SheetMap` and its lazy `Cells` / `Items` iterators.
//! Role: The only place mapping semantics are translated into row primitives.
//! Invariants: At most one row per encoded key, enforced here at write time.
//! Invariants: Nothing is cached; every call reads the table afresh.
//! Invariants: Multi-call operations are not atomic; callers serialize access.
use std::borrow::Borrow;
use std::fmt;
use std::marker::PhantomData;

use tracing::debug;

use crate::core::codec::{Codec, Decode, Describe, Encode, Opaque};
use crate::core::error::{Error, ErrorKind, Result};
use crate::core::table::{Column, Table};

use super::snapshot::Snapshot;

/// Mapping facade over a [`Table`]: keys in column 1, values in column 2.
///
/// Every keyed operation is a linear scan of the key column. The handle is
/// borrowed or owned as given; the map never opens, closes or authenticates it.
pub struct SheetMap<K, V, T, C = Opaque> {
    table: T,
    codec: C,
    _entries: PhantomData<fn() -> (K, V)>,
}

impl<K, V, T> SheetMap<K, V, T, Opaque> {
    pub fn new(table: T) -> Self {
        Self::with_codec(table, Opaque)
    }
}

impl<K, V, T, C> SheetMap<K, V, T, C> {
    pub fn with_codec(table: T, codec: C) -> Self {
        Self {
            table,
            codec,
            _entries: PhantomData,
        }
    }

    pub fn table(&self) -> &T {
        &self.table
    }

    pub fn table_mut(&mut self) -> &mut T {
        &mut self.table
    }

    pub fn codec(&self) -> &C {
        &self.codec
    }

    pub fn into_table(self) -> T {
        self.table
    }
}

impl<K, V, T, C: Describe> SheetMap<K, V, T, C> {
    pub fn describe_codec(&self) -> &'static str {
        self.codec.describe()
    }
}

impl<K, V, T, C> SheetMap<K, V, T, C>
where
    T: Table,
    C: Codec<K> + Codec<V>,
{
    fn locate<Q>(&self, key: &Q) -> Result<(String, Option<usize>)>
    where
        Q: ?Sized,
        C: Encode<Q>,
    {
        let cell = Encode::<Q>::encode(&self.codec, key)?;
        let row = self.table.find_row(&cell, Column::Key)?;
        Ok((cell, row))
    }

    fn read_value(&self, row: usize) -> Result<V> {
        let cell = self.table.read_cell(row, Column::Value)?;
        Decode::<V>::decode(&self.codec, &cell).map_err(|err| err.with_row(row))
    }

    pub fn get<Q>(&self, key: &Q) -> Result<V>
    where
        K: Borrow<Q>,
        Q: ?Sized,
        C: Encode<Q>,
    {
        let (cell, row) = self.locate(key)?;
        let Some(row) = row else {
            debug!(key = %cell, "get: miss");
            return Err(not_found(&cell));
        };
        debug!(row, "get");
        self.read_value(row)
    }

    /// `None` only when no row holds the key; table failures still propagate.
    pub fn get_opt<Q>(&self, key: &Q) -> Result<Option<V>>
    where
        K: Borrow<Q>,
        Q: ?Sized,
        C: Encode<Q>,
    {
        let (_, row) = self.locate(key)?;
        row.map(|row| self.read_value(row)).transpose()
    }

    pub fn get_or<Q>(&self, key: &Q, default: V) -> Result<V>
    where
        K: Borrow<Q>,
        Q: ?Sized,
        C: Encode<Q>,
    {
        Ok(self.get_opt(key)?.unwrap_or(default))
    }

    /// Overwrites the value cell of an existing key, or appends a new row.
    pub fn set<Q, R>(&mut self, key: &Q, value: &R) -> Result<()>
    where
        K: Borrow<Q>,
        V: Borrow<R>,
        Q: ?Sized,
        R: ?Sized,
        C: Encode<Q> + Encode<R>,
    {
        let value_cell = Encode::<R>::encode(&self.codec, value)?;
        let (key_cell, row) = self.locate(key)?;
        match row {
            Some(row) => {
                debug!(row, "set: update");
                self.table.write_cell(row, Column::Value, &value_cell)
            }
            None => {
                debug!("set: append");
                self.table.append_row(&key_cell, &value_cell)
            }
        }
    }

    pub fn delete<Q>(&mut self, key: &Q) -> Result<()>
    where
        K: Borrow<Q>,
        Q: ?Sized,
        C: Encode<Q>,
    {
        let (cell, row) = self.locate(key)?;
        let Some(row) = row else {
            return Err(not_found(&cell));
        };
        debug!(row, "delete");
        self.table.delete_row(row)
    }

    /// Deletes the key and returns the value it held.
    pub fn remove<Q>(&mut self, key: &Q) -> Result<V>
    where
        K: Borrow<Q>,
        Q: ?Sized,
        C: Encode<Q>,
    {
        let (cell, row) = self.locate(key)?;
        let Some(row) = row else {
            return Err(not_found(&cell));
        };
        let value = self.read_value(row)?;
        debug!(row, "remove");
        self.table.delete_row(row)?;
        Ok(value)
    }

    pub fn contains<Q>(&self, key: &Q) -> Result<bool>
    where
        K: Borrow<Q>,
        Q: ?Sized,
        C: Encode<Q>,
    {
        let (_, row) = self.locate(key)?;
        Ok(row.is_some())
    }

    pub fn clear(&mut self) -> Result<()> {
        debug!("clear");
        self.table.clear_all()
    }

    /// Row count, read from the table on every call.
    pub fn len(&self) -> Result<usize> {
        Ok(self.table.read_all_rows()?.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    pub fn keys(&self) -> Result<Cells<'_, K, C>> {
        let cells = self.table.read_column(Column::Key)?;
        Ok(Cells::new(cells, &self.codec))
    }

    pub fn values(&self) -> Result<Cells<'_, V, C>> {
        let cells = self.table.read_column(Column::Value)?;
        Ok(Cells::new(cells, &self.codec))
    }

    pub fn items(&self) -> Result<Items<'_, K, V, C>> {
        let rows = self.table.read_all_rows()?;
        Ok(Items {
            rows: rows.into_iter(),
            next_row: 1,
            codec: &self.codec,
            _entries: PhantomData,
        })
    }

    pub fn reversed_keys(&self) -> Result<std::iter::Rev<Cells<'_, K, C>>> {
        Ok(self.keys()?.rev())
    }

    /// Removes the highest-numbered row and returns its decoded entry.
    pub fn pop_last(&mut self) -> Result<(K, V)> {
        let rows = self.table.read_all_rows()?;
        let row = rows.len();
        let Some((key_cell, value_cell)) = rows.into_iter().last() else {
            return Err(Error::new(ErrorKind::EmptyCollection)
                .with_message("pop_last on an empty table"));
        };
        let key = Decode::<K>::decode(&self.codec, &key_cell).map_err(|err| err.with_row(row))?;
        let value =
            Decode::<V>::decode(&self.codec, &value_cell).map_err(|err| err.with_row(row))?;
        debug!(row, "pop_last");
        self.table.delete_row(row)?;
        Ok((key, value))
    }

    /// Returns the stored value, or stores `default` and returns it.
    pub fn set_default<Q>(&mut self, key: &Q, default: V) -> Result<V>
    where
        K: Borrow<Q>,
        Q: ?Sized,
        C: Encode<Q>,
    {
        let (key_cell, row) = self.locate(key)?;
        if let Some(row) = row {
            return self.read_value(row);
        }
        let value_cell = Encode::<V>::encode(&self.codec, &default)?;
        debug!("set_default: append");
        self.table.append_row(&key_cell, &value_cell)?;
        Ok(default)
    }

    /// Applies `set` for each pair, in the source's iteration order.
    pub fn update<I, A, B>(&mut self, source: I) -> Result<()>
    where
        I: IntoIterator<Item = (A, B)>,
        A: Into<K>,
        B: Into<V>,
    {
        for (key, value) in source {
            let key: K = key.into();
            let value: V = value.into();
            self.set::<K, V>(&key, &value)?;
        }
        Ok(())
    }

    /// `update(source)` followed by `update(overrides)`.
    pub fn update_with<I, J, A, B, X, Y>(&mut self, source: I, overrides: J) -> Result<()>
    where
        I: IntoIterator<Item = (A, B)>,
        J: IntoIterator<Item = (X, Y)>,
        A: Into<K>,
        B: Into<V>,
        X: Into<K>,
        Y: Into<V>,
    {
        self.update(source)?;
        self.update(overrides)
    }

    pub fn merge_into<I, A, B>(&mut self, other: I) -> Result<()>
    where
        I: IntoIterator<Item = (A, B)>,
        A: Into<K>,
        B: Into<V>,
    {
        self.update(other)
    }
}

impl<K, V, T, C> SheetMap<K, V, T, C>
where
    K: PartialEq,
    T: Table,
    C: Codec<K> + Codec<V>,
{
    /// Detached copy of every entry, in row order.
    pub fn to_snapshot(&self) -> Result<Snapshot<K, V>> {
        self.items()?.collect()
    }

    /// Current contents combined with `other`; `other` wins on collisions.
    /// The table is not modified.
    pub fn merge<I, A, B>(&self, other: I) -> Result<Snapshot<K, V>>
    where
        I: IntoIterator<Item = (A, B)>,
        A: Into<K>,
        B: Into<V>,
    {
        let mut merged = self.to_snapshot()?;
        merged.extend(
            other
                .into_iter()
                .map(|(key, value)| (key.into(), value.into())),
        );
        Ok(merged)
    }

    pub fn equals(&self, other: &Snapshot<K, V>) -> Result<bool>
    where
        V: PartialEq,
    {
        Ok(&self.to_snapshot()? == other)
    }

    /// Same layout as [`SheetMap::render`] with a caller-chosen entry format.
    pub fn render_with<F>(&self, entry: F) -> Result<String>
    where
        F: FnMut(&K, &V) -> String,
    {
        Ok(self.to_snapshot()?.render_with(entry))
    }
}

impl<K, V, T, C> SheetMap<K, V, T, C>
where
    K: PartialEq + fmt::Debug,
    V: fmt::Debug,
    T: Table,
    C: Codec<K> + Codec<V>,
{
    /// `{k: v, ...}` from the entries' `Debug` forms, in row order.
    pub fn render(&self) -> Result<String> {
        Ok(self.to_snapshot()?.to_string())
    }
}

impl<K, V, T: fmt::Debug, C: fmt::Debug> fmt::Debug for SheetMap<K, V, T, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SheetMap")
            .field("table", &self.table)
            .field("codec", &self.codec)
            .finish()
    }
}

fn not_found(cell: &str) -> Error {
    Error::new(ErrorKind::NotFound).with_message(format!("no row for key cell {cell:?}"))
}

/// Lazily decoded cells of one column, read when the iterator was created.
pub struct Cells<'a, T, C> {
    cells: std::vec::IntoIter<String>,
    // Row number of the next cell taken from the front.
    front_row: usize,
    codec: &'a C,
    _item: PhantomData<fn() -> T>,
}

impl<'a, T, C> Cells<'a, T, C> {
    fn new(cells: Vec<String>, codec: &'a C) -> Self {
        Self {
            cells: cells.into_iter(),
            front_row: 1,
            codec,
            _item: PhantomData,
        }
    }
}

impl<T, C: Decode<T>> Cells<'_, T, C> {
    fn decode(&self, cell: &str, row: usize) -> Result<T> {
        Decode::<T>::decode(self.codec, cell).map_err(|err| err.with_row(row))
    }
}

impl<T, C: Decode<T>> Iterator for Cells<'_, T, C> {
    type Item = Result<T>;

    fn next(&mut self) -> Option<Self::Item> {
        let cell = self.cells.next()?;
        let row = self.front_row;
        self.front_row += 1;
        Some(self.decode(&cell, row))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.cells.size_hint()
    }
}

impl<T, C: Decode<T>> DoubleEndedIterator for Cells<'_, T, C> {
    fn next_back(&mut self) -> Option<Self::Item> {
        let cell = self.cells.next_back()?;
        let row = self.front_row + self.cells.len();
        Some(self.decode(&cell, row))
    }
}

impl<T, C: Decode<T>> ExactSizeIterator for Cells<'_, T, C> {}

/// Lazily decoded `(key, value)` rows from a single full-table read.
pub struct Items<'a, K, V, C> {
    rows: std::vec::IntoIter<(String, String)>,
    next_row: usize,
    codec: &'a C,
    _entries: PhantomData<fn() -> (K, V)>,
}

impl<K, V, C> Iterator for Items<'_, K, V, C>
where
    C: Decode<K> + Decode<V>,
{
    type Item = Result<(K, V)>;

    fn next(&mut self) -> Option<Self::Item> {
        let (key_cell, value_cell) = self.rows.next()?;
        let row = self.next_row;
        self.next_row += 1;
        let entry = Decode::<K>::decode(self.codec, &key_cell)
            .and_then(|key| Decode::<V>::decode(self.codec, &value_cell).map(|value| (key, value)))
            .map_err(|err| err.with_row(row));
        Some(entry)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.rows.size_hint()
    }
}

impl<K, V, C> ExactSizeIterator for Items<'_, K, V, C> where C: Decode<K> + Decode<V> {}
