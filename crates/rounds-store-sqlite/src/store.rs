//! [`SqliteStore`]: the SQLite implementation of [`DeliveryStore`].

use std::{collections::BTreeMap, path::Path};

use chrono::{NaiveDate, Utc};
use rusqlite::{Connection, OptionalExtension as _, Transaction};
use uuid::Uuid;

use rounds_core::{
  cascade::{
    AssignmentChange, PendingStop, Reassignment, plan_deactivation, plan_gap_fill,
    plan_reassignment,
  },
  coverage::{Agent, CoverageArea, CoverageSnapshot, NewAgent, NewArea},
  error::Entity,
  lifecycle::{Obligation, ObligationStatus, ProofInput, ReasonInput},
  route::RouteStop,
  schedule::is_delivery_day,
  store::DeliveryStore,
  subscription::{
    Address, NewAddress, NewSubscription, PauseWindow, Subscription, SubscriptionStatus,
  },
};

use crate::{
  Error, Result,
  encode::{
    OBLIGATION_COLUMNS, RawAddress, RawAgent, RawArea, RawObligation, RawSubscription,
    SUBSCRIPTION_COLUMNS, decode_location, encode_date, encode_dt, encode_products,
    encode_state, encode_uuid,
  },
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A delivery store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted. All access
/// goes through one background connection, so writes are serialised.
#[derive(Clone)]
pub struct SqliteStore {
  pub(crate) conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Run `f` on the connection thread, outside any transaction.
  async fn run<T, F>(&self, f: F) -> Result<T>
  where
    F: FnOnce(&Connection) -> Result<T> + Send + 'static,
    T: Send + 'static,
  {
    self.conn.call(move |conn| Ok(f(conn))).await?
  }

  /// Run `f` on the connection thread inside one transaction.
  async fn transact<T, F>(&self, f: F) -> Result<T>
  where
    F: FnOnce(&Transaction<'_>) -> Result<T> + Send + 'static,
    T: Send + 'static,
  {
    self.conn.call(move |conn| Ok(in_transaction(conn, f))).await?
  }
}

/// Commit only if `f` succeeds. Dropping an uncommitted transaction rolls
/// back every write `f` made.
fn in_transaction<T>(
  conn: &mut Connection,
  f: impl FnOnce(&Transaction<'_>) -> Result<T>,
) -> Result<T> {
  let tx = conn.transaction()?;
  let out = f(&tx)?;
  tx.commit()?;
  Ok(out)
}

// ─── Row helpers ─────────────────────────────────────────────────────────────
//
// Synchronous helpers run on the connection thread. They take `&Connection`
// so they work both inside and outside a transaction.

fn load_area(conn: &Connection, id: Uuid) -> Result<Option<CoverageArea>> {
  let id_str = encode_uuid(id);
  let raw = conn
    .query_row(
      "SELECT area_id, name, created_at FROM areas WHERE area_id = ?1",
      rusqlite::params![id_str],
      |row| {
        Ok(RawArea {
          area_id:    row.get(0)?,
          name:       row.get(1)?,
          created_at: row.get(2)?,
        })
      },
    )
    .optional()?;
  let Some(raw) = raw else { return Ok(None) };

  let mut stmt =
    conn.prepare("SELECT postal_code FROM area_postal_codes WHERE area_id = ?1")?;
  let codes = stmt
    .query_map(rusqlite::params![id_str], |row| row.get::<_, String>(0))?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  raw.into_area(codes).map(Some)
}

fn load_areas(conn: &Connection) -> Result<Vec<CoverageArea>> {
  let mut codes: BTreeMap<String, Vec<String>> = BTreeMap::new();
  let mut stmt = conn.prepare("SELECT area_id, postal_code FROM area_postal_codes")?;
  let rows = stmt.query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))?;
  for row in rows {
    let (area_id, code) = row?;
    codes.entry(area_id).or_default().push(code);
  }

  let mut stmt = conn.prepare("SELECT area_id, name, created_at FROM areas ORDER BY name")?;
  let raws = stmt
    .query_map([], |row| {
      Ok(RawArea {
        area_id:    row.get(0)?,
        name:       row.get(1)?,
        created_at: row.get(2)?,
      })
    })?
    .collect::<rusqlite::Result<Vec<_>>>()?;

  raws
    .into_iter()
    .map(|raw| {
      let area_codes = codes.remove(&raw.area_id).unwrap_or_default();
      raw.into_area(area_codes)
    })
    .collect()
}

const AGENT_COLUMNS: &str = "agent_id, name, area_id, active, created_at";

fn load_agent(conn: &Connection, id: Uuid) -> Result<Option<Agent>> {
  let raw = conn
    .query_row(
      &format!("SELECT {AGENT_COLUMNS} FROM agents WHERE agent_id = ?1"),
      rusqlite::params![encode_uuid(id)],
      RawAgent::from_row,
    )
    .optional()?;
  raw.map(RawAgent::into_agent).transpose()
}

fn load_agents(conn: &Connection) -> Result<Vec<Agent>> {
  let mut stmt = conn.prepare(&format!("SELECT {AGENT_COLUMNS} FROM agents ORDER BY agent_id"))?;
  let raws = stmt
    .query_map([], RawAgent::from_row)?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  raws.into_iter().map(RawAgent::into_agent).collect()
}

fn load_snapshot(conn: &Connection) -> Result<CoverageSnapshot> {
  Ok(CoverageSnapshot::new(load_areas(conn)?, load_agents(conn)?))
}

fn load_subscription(conn: &Connection, id: Uuid) -> Result<Option<Subscription>> {
  let raw = conn
    .query_row(
      &format!("SELECT {SUBSCRIPTION_COLUMNS} FROM subscriptions s WHERE s.subscription_id = ?1"),
      rusqlite::params![encode_uuid(id)],
      RawSubscription::from_row,
    )
    .optional()?;
  raw.map(RawSubscription::into_subscription).transpose()
}

fn save_subscription_status(conn: &Connection, s: &Subscription) -> Result<()> {
  conn.execute(
    "UPDATE subscriptions SET status = ?1, pause_start = ?2, pause_end = ?3
     WHERE subscription_id = ?4",
    rusqlite::params![
      <&'static str>::from(s.status),
      s.pause.map(|w| encode_date(w.start)),
      s.pause.map(|w| encode_date(w.end)),
      encode_uuid(s.subscription_id),
    ],
  )?;
  Ok(())
}

fn load_obligation(conn: &Connection, id: Uuid) -> Result<Option<Obligation>> {
  let raw = conn
    .query_row(
      &format!("SELECT {OBLIGATION_COLUMNS} FROM obligations o WHERE o.obligation_id = ?1"),
      rusqlite::params![encode_uuid(id)],
      RawObligation::from_row,
    )
    .optional()?;
  raw.map(RawObligation::into_obligation).transpose()
}

fn save_obligation_state(conn: &Connection, ob: &Obligation) -> Result<()> {
  let cols = encode_state(&ob.state);
  conn.execute(
    "UPDATE obligations SET
       status = ?1, started_at = ?2, proof_kind = ?3, proof_url = ?4,
       proof_captured_at = ?5, failure_code = ?6, failure_note = ?7, completed_at = ?8
     WHERE obligation_id = ?9",
    rusqlite::params![
      cols.status,
      cols.started_at,
      cols.proof_kind,
      cols.proof_url,
      cols.proof_captured_at,
      cols.failure_code,
      cols.failure_note,
      cols.completed_at,
      encode_uuid(ob.obligation_id),
    ],
  )?;
  Ok(())
}

/// Pending obligations matching `filter`, with their delivery postal codes.
/// `filter` is a SQL condition over `o` whose only parameter is `?1`.
fn pending_stops(conn: &Connection, filter: &str, param: &str) -> Result<Vec<PendingStop>> {
  let mut stmt = conn.prepare(&format!(
    "SELECT o.obligation_id, a.postal_code
     FROM obligations o
     JOIN subscriptions s ON s.subscription_id = o.subscription_id
     JOIN addresses     a ON a.address_id      = s.address_id
     WHERE o.status = 'pending' AND {filter}
     ORDER BY o.created_at, o.obligation_id"
  ))?;
  let rows = stmt
    .query_map(rusqlite::params![param], |row| {
      Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
    })?
    .collect::<rusqlite::Result<Vec<_>>>()?;

  rows
    .into_iter()
    .map(|(id, postal_code)| -> Result<PendingStop> {
      Ok(PendingStop {
        obligation_id: Uuid::parse_str(&id)?,
        postal_code,
      })
    })
    .collect()
}

/// Apply assignment changes; only still-pending rows are touched.
fn apply_changes(conn: &Connection, changes: &[AssignmentChange]) -> Result<usize> {
  let mut stmt = conn.prepare(
    "UPDATE obligations SET agent_id = ?1 WHERE obligation_id = ?2 AND status = 'pending'",
  )?;
  let mut applied = 0;
  for change in changes {
    tracing::debug!(
      obligation_id = %change.obligation_id,
      from = ?change.from,
      to = ?change.to,
      "reassigning obligation"
    );
    applied += stmt.execute(rusqlite::params![
      change.to.map(encode_uuid),
      encode_uuid(change.obligation_id),
    ])?;
  }
  Ok(applied)
}

/// Load an obligation, apply `transition`, and write the new state back.
fn transition_obligation<F>(conn: &Connection, id: Uuid, transition: F) -> Result<Obligation>
where
  F: FnOnce(&mut Obligation) -> rounds_core::Result<()>,
{
  let mut ob = load_obligation(conn, id)?
    .ok_or(rounds_core::Error::not_found(Entity::Obligation, id))?;
  transition(&mut ob)?;
  save_obligation_state(conn, &ob)?;
  Ok(ob)
}

fn generate(conn: &Connection, date: NaiveDate) -> Result<usize> {
  let snapshot = load_snapshot(conn)?;
  let date_str = encode_date(date);

  let mut stmt = conn.prepare(&format!(
    "SELECT {SUBSCRIPTION_COLUMNS}, a.postal_code
     FROM subscriptions s
     JOIN addresses a ON a.address_id = s.address_id
     WHERE s.status <> 'cancelled' AND s.start_date <= ?1
     ORDER BY s.created_at, s.subscription_id"
  ))?;
  let rows = stmt
    .query_map(rusqlite::params![date_str], |row| {
      Ok((RawSubscription::from_row(row)?, row.get::<_, String>(10)?))
    })?
    .collect::<rusqlite::Result<Vec<_>>>()?;

  let mut insert = conn.prepare(
    "INSERT INTO obligations
       (obligation_id, subscription_id, delivery_date, agent_id, status, created_at)
     VALUES (?1, ?2, ?3, ?4, 'pending', ?5)
     ON CONFLICT (subscription_id, delivery_date) DO NOTHING",
  )?;

  let mut created = 0;
  for (raw, postal_code) in rows {
    let sub = raw.into_subscription()?;
    if !sub.is_eligible_on(date)
      || !is_delivery_day(sub.start_date, date, sub.recurrence, sub.pause.as_ref())
    {
      continue;
    }
    let agent_id = snapshot.resolve(&postal_code, None).map(|a| a.agent_id);
    if agent_id.is_none() {
      tracing::debug!(
        subscription_id = %sub.subscription_id,
        %postal_code,
        "no agent covers address; obligation left unassigned"
      );
    }
    created += insert.execute(rusqlite::params![
      encode_uuid(Uuid::new_v4()),
      encode_uuid(sub.subscription_id),
      date_str,
      agent_id.map(encode_uuid),
      encode_dt(Utc::now()),
    ])?;
  }
  Ok(created)
}

// ─── DeliveryStore impl ──────────────────────────────────────────────────────

impl DeliveryStore for SqliteStore {
  type Error = Error;

  // ── Coverage ──────────────────────────────────────────────────────────────

  async fn create_area(&self, input: NewArea) -> Result<CoverageArea> {
    let input = input.normalized()?;
    let area = CoverageArea {
      area_id:      Uuid::new_v4(),
      name:         input.name,
      postal_codes: input.postal_codes,
      created_at:   Utc::now(),
    };

    let out = area.clone();
    self
      .transact(move |tx| {
        let id_str = encode_uuid(area.area_id);
        tx.execute(
          "INSERT INTO areas (area_id, name, created_at) VALUES (?1, ?2, ?3)",
          rusqlite::params![id_str, area.name, encode_dt(area.created_at)],
        )?;
        let mut stmt =
          tx.prepare("INSERT INTO area_postal_codes (area_id, postal_code) VALUES (?1, ?2)")?;
        for code in &area.postal_codes {
          stmt.execute(rusqlite::params![id_str, code])?;
        }
        Ok(())
      })
      .await?;
    Ok(out)
  }

  async fn get_area(&self, id: Uuid) -> Result<Option<CoverageArea>> {
    self.run(move |conn| load_area(conn, id)).await
  }

  async fn list_areas(&self) -> Result<Vec<CoverageArea>> { self.run(load_areas).await }

  async fn create_agent(&self, input: NewAgent) -> Result<Agent> {
    let agent = Agent {
      agent_id:   Uuid::new_v4(),
      name:       input.name,
      area_id:    input.area_id,
      active:     true,
      created_at: Utc::now(),
    };

    let out = agent.clone();
    self
      .transact(move |tx| {
        if load_area(tx, agent.area_id)?.is_none() {
          return Err(rounds_core::Error::InvalidArea(agent.area_id).into());
        }
        tx.execute(
          "INSERT INTO agents (agent_id, name, area_id, active, created_at)
           VALUES (?1, ?2, ?3, 1, ?4)",
          rusqlite::params![
            encode_uuid(agent.agent_id),
            agent.name,
            encode_uuid(agent.area_id),
            encode_dt(agent.created_at),
          ],
        )?;
        Ok(())
      })
      .await?;
    Ok(out)
  }

  async fn get_agent(&self, id: Uuid) -> Result<Option<Agent>> {
    self.run(move |conn| load_agent(conn, id)).await
  }

  async fn list_agents(&self) -> Result<Vec<Agent>> { self.run(load_agents).await }

  async fn coverage_snapshot(&self) -> Result<CoverageSnapshot> {
    self.run(load_snapshot).await
  }

  async fn reassign_agent_area(&self, agent_id: Uuid, new_area_id: Uuid) -> Result<Reassignment> {
    self
      .transact(move |tx| {
        if load_area(tx, new_area_id)?.is_none() {
          return Err(rounds_core::Error::InvalidArea(new_area_id).into());
        }
        let mut agent = load_agent(tx, agent_id)?
          .ok_or(rounds_core::Error::not_found(Entity::Agent, agent_id))?;
        if agent.area_id == new_area_id {
          return Ok(Reassignment { agent, reassigned_count: 0 });
        }

        let snapshot = load_snapshot(tx)?;
        let pending = pending_stops(tx, "o.agent_id = ?1", &encode_uuid(agent_id))?;
        let plan = plan_reassignment(&snapshot, agent_id, new_area_id, &pending);
        let reassigned_count = apply_changes(tx, &plan)?;

        tx.execute(
          "UPDATE agents SET area_id = ?1 WHERE agent_id = ?2",
          rusqlite::params![encode_uuid(new_area_id), encode_uuid(agent_id)],
        )?;
        agent.area_id = new_area_id;
        Ok(Reassignment { agent, reassigned_count })
      })
      .await
  }

  async fn set_agent_active(&self, agent_id: Uuid, active: bool) -> Result<Reassignment> {
    self
      .transact(move |tx| {
        let mut agent = load_agent(tx, agent_id)?
          .ok_or(rounds_core::Error::not_found(Entity::Agent, agent_id))?;

        let reassigned_count = if active {
          0
        } else {
          let pending = pending_stops(tx, "o.agent_id = ?1", &encode_uuid(agent_id))?;
          apply_changes(tx, &plan_deactivation(agent_id, &pending))?
        };

        tx.execute(
          "UPDATE agents SET active = ?1 WHERE agent_id = ?2",
          rusqlite::params![active, encode_uuid(agent_id)],
        )?;
        agent.active = active;
        Ok(Reassignment { agent, reassigned_count })
      })
      .await
  }

  // ── Addresses & subscriptions ─────────────────────────────────────────────

  async fn create_address(&self, input: NewAddress) -> Result<Address> {
    let address = Address {
      address_id:  Uuid::new_v4(),
      line:        input.line,
      postal_code: input.postal_code.trim().to_owned(),
      location:    input.location,
    };

    let out = address.clone();
    self
      .run(move |conn| {
        conn.execute(
          "INSERT INTO addresses (address_id, line, postal_code, lat, lng)
           VALUES (?1, ?2, ?3, ?4, ?5)",
          rusqlite::params![
            encode_uuid(address.address_id),
            address.line,
            address.postal_code,
            address.location.map(|p| p.lat),
            address.location.map(|p| p.lng),
          ],
        )?;
        Ok(())
      })
      .await?;
    Ok(out)
  }

  async fn get_address(&self, id: Uuid) -> Result<Option<Address>> {
    self
      .run(move |conn| {
        let raw = conn
          .query_row(
            "SELECT address_id, line, postal_code, lat, lng FROM addresses WHERE address_id = ?1",
            rusqlite::params![encode_uuid(id)],
            |row| {
              Ok(RawAddress {
                address_id:  row.get(0)?,
                line:        row.get(1)?,
                postal_code: row.get(2)?,
                lat:         row.get(3)?,
                lng:         row.get(4)?,
              })
            },
          )
          .optional()?;
        raw.map(RawAddress::into_address).transpose()
      })
      .await
  }

  async fn create_subscription(&self, input: NewSubscription) -> Result<Subscription> {
    let subscription = Subscription {
      subscription_id: Uuid::new_v4(),
      customer_id:     input.customer_id,
      address_id:      input.address_id,
      products:        input.products,
      recurrence:      input.recurrence,
      start_date:      input.start_date,
      pause:           None,
      status:          SubscriptionStatus::Active,
      created_at:      Utc::now(),
    };
    let products_json = encode_products(&subscription.products)?;

    let out = subscription.clone();
    self
      .transact(move |tx| {
        let address_exists = tx
          .query_row(
            "SELECT 1 FROM addresses WHERE address_id = ?1",
            rusqlite::params![encode_uuid(subscription.address_id)],
            |_| Ok(()),
          )
          .optional()?
          .is_some();
        if !address_exists {
          return Err(
            rounds_core::Error::not_found(Entity::Address, subscription.address_id).into(),
          );
        }

        tx.execute(
          "INSERT INTO subscriptions (
             subscription_id, customer_id, address_id, products, recurrence,
             start_date, status, created_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
          rusqlite::params![
            encode_uuid(subscription.subscription_id),
            encode_uuid(subscription.customer_id),
            encode_uuid(subscription.address_id),
            products_json,
            <&'static str>::from(subscription.recurrence),
            encode_date(subscription.start_date),
            <&'static str>::from(subscription.status),
            encode_dt(subscription.created_at),
          ],
        )?;
        Ok(())
      })
      .await?;
    Ok(out)
  }

  async fn get_subscription(&self, id: Uuid) -> Result<Option<Subscription>> {
    self.run(move |conn| load_subscription(conn, id)).await
  }

  async fn pause_subscription(&self, id: Uuid, window: PauseWindow) -> Result<Subscription> {
    self
      .transact(move |tx| {
        let mut s = load_subscription(tx, id)?
          .ok_or(rounds_core::Error::not_found(Entity::Subscription, id))?;
        s.pause(window)?;
        save_subscription_status(tx, &s)?;
        Ok(s)
      })
      .await
  }

  async fn resume_subscription(&self, id: Uuid) -> Result<Subscription> {
    self
      .transact(move |tx| {
        let mut s = load_subscription(tx, id)?
          .ok_or(rounds_core::Error::not_found(Entity::Subscription, id))?;
        s.resume()?;
        save_subscription_status(tx, &s)?;
        Ok(s)
      })
      .await
  }

  async fn cancel_subscription(&self, id: Uuid) -> Result<Subscription> {
    self
      .transact(move |tx| {
        let mut s = load_subscription(tx, id)?
          .ok_or(rounds_core::Error::not_found(Entity::Subscription, id))?;
        s.cancel();
        save_subscription_status(tx, &s)?;
        Ok(s)
      })
      .await
  }

  // ── Obligations ───────────────────────────────────────────────────────────

  async fn generate_for_date(&self, date: NaiveDate) -> Result<usize> {
    self.transact(move |tx| generate(tx, date)).await
  }

  async fn assign_unassigned(&self, date: NaiveDate) -> Result<usize> {
    self
      .transact(move |tx| {
        let snapshot = load_snapshot(tx)?;
        let unassigned = pending_stops(
          tx,
          "o.agent_id IS NULL AND o.delivery_date = ?1",
          &encode_date(date),
        )?;
        apply_changes(tx, &plan_gap_fill(&snapshot, &unassigned))
      })
      .await
  }

  async fn get_obligation(&self, id: Uuid) -> Result<Option<Obligation>> {
    self.run(move |conn| load_obligation(conn, id)).await
  }

  async fn daily_obligations(&self, agent_id: Uuid, date: NaiveDate) -> Result<Vec<Obligation>> {
    self
      .run(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {OBLIGATION_COLUMNS} FROM obligations o
           WHERE o.agent_id = ?1 AND o.delivery_date = ?2
           ORDER BY o.created_at, o.obligation_id"
        ))?;
        let raws = stmt
          .query_map(
            rusqlite::params![encode_uuid(agent_id), encode_date(date)],
            RawObligation::from_row,
          )?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        raws.into_iter().map(RawObligation::into_obligation).collect()
      })
      .await
  }

  async fn route_stops(&self, agent_id: Uuid, date: NaiveDate) -> Result<Vec<RouteStop>> {
    self
      .run(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {OBLIGATION_COLUMNS}, a.postal_code, a.lat, a.lng
           FROM obligations o
           JOIN subscriptions s ON s.subscription_id = o.subscription_id
           JOIN addresses     a ON a.address_id      = s.address_id
           WHERE o.agent_id = ?1 AND o.delivery_date = ?2
             AND o.status IN ('pending', 'in_progress')
           ORDER BY o.created_at, o.obligation_id"
        ))?;
        let rows = stmt
          .query_map(
            rusqlite::params![encode_uuid(agent_id), encode_date(date)],
            |row| {
              Ok((
                RawObligation::from_row(row)?,
                row.get::<_, String>(13)?,
                row.get::<_, Option<f64>>(14)?,
                row.get::<_, Option<f64>>(15)?,
              ))
            },
          )?
          .collect::<rusqlite::Result<Vec<_>>>()?;

        rows
          .into_iter()
          .map(|(raw, postal_code, lat, lng)| -> Result<RouteStop> {
            Ok(RouteStop {
              obligation: raw.into_obligation()?,
              postal_code,
              location: decode_location(lat, lng),
            })
          })
          .collect()
      })
      .await
  }

  async fn start_obligation(&self, id: Uuid, agent_id: Uuid) -> Result<Obligation> {
    self
      .transact(move |tx| transition_obligation(tx, id, |ob| ob.start(agent_id, Utc::now())))
      .await
  }

  async fn complete_obligation(
    &self,
    id: Uuid,
    agent_id: Uuid,
    proof: Option<ProofInput>,
  ) -> Result<Obligation> {
    self
      .transact(move |tx| {
        transition_obligation(tx, id, |ob| ob.complete(agent_id, proof, Utc::now()))
      })
      .await
  }

  async fn fail_obligation(
    &self,
    id: Uuid,
    agent_id: Uuid,
    reason: ReasonInput,
  ) -> Result<Obligation> {
    self
      .transact(move |tx| transition_obligation(tx, id, |ob| ob.fail(agent_id, reason, Utc::now())))
      .await
  }
}

impl SqliteStore {
  /// Count obligations per status on `date`; used by the server's daily
  /// generation summary.
  pub async fn status_counts(&self, date: NaiveDate) -> Result<BTreeMap<ObligationStatus, usize>> {
    self
      .run(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT status, COUNT(*) FROM obligations WHERE delivery_date = ?1 GROUP BY status",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![encode_date(date)], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        rows
          .into_iter()
          .map(|(status, n)| -> Result<(ObligationStatus, usize)> {
            let status = status.parse::<ObligationStatus>().map_err(|_| {
              Error::Decode(format!("unknown obligation status {status:?}"))
            })?;
            Ok((status, n as usize))
          })
          .collect()
      })
      .await
  }
}
