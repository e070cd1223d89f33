use aeroflow_core::repository::{
    sort_queue, BoardingRepository, BookingFilter, BookingRepository, Constraint, FlightFilter,
    FlightRepository, FlightSort, PassengerRepository, StoreError, StoreResult,
};
use aeroflow_core::{
    Baggage, BoardingGroup, BoardingQueueEntry, Booking, BookingStatus, Flight, FlightStatus,
    Passenger, PerClass, QueueEntryView, QueueStatus, SeatClass,
};
use aeroflow_shared::{Masked, Page, PageRequest};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::types::Json;
use sqlx::{Pool, Postgres, QueryBuilder};
use std::time::Duration;
use tracing::info;
use uuid::Uuid;

/// PostgreSQL-backed store. Uniqueness rules live in the schema.
#[derive(Clone)]
pub struct PgStore {
    pub pool: Pool<Postgres>,
}

impl PgStore {
    pub async fn connect(connection_string: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(3))
            .connect(connection_string)
            .await?;

        Ok(Self { pool })
    }

    pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
        info!("Running database migrations...");
        sqlx::migrate!("../migrations").run(&self.pool).await?;
        info!("Migrations completed successfully.");
        Ok(())
    }
}

fn store_err(err: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db) = &err {
        if db.is_unique_violation() {
            let constraint = match db.constraint() {
                Some("flights_flight_number_key") => Some(Constraint::FlightNumber),
                Some("passengers_passport_number_key") => Some(Constraint::PassportNumber),
                Some("bookings_booking_reference_key") => Some(Constraint::BookingReference),
                Some("bookings_active_seat_key") => Some(Constraint::Seat),
                Some("boarding_queue_booking_id_key") => Some(Constraint::QueueBooking),
                Some("boarding_queue_position_key") => Some(Constraint::QueuePosition),
                _ => None,
            };
            if let Some(constraint) = constraint {
                return StoreError::duplicate(constraint);
            }
        }
    }
    StoreError::Backend(err.to_string())
}

fn decode<T>(result: aeroflow_core::CoreResult<T>) -> StoreResult<T> {
    result.map_err(|e| StoreError::Backend(format!("corrupt row: {}", e)))
}

fn expect_row(rows: u64, what: &'static str) -> StoreResult<()> {
    if rows == 0 {
        return Err(StoreError::NotFound(what));
    }
    Ok(())
}

fn seats(value: i32) -> u32 {
    value.max(0) as u32
}

// ============================================================================
// Row types
// ============================================================================

#[derive(sqlx::FromRow)]
struct FlightRow {
    id: Uuid,
    flight_number: String,
    airline: String,
    aircraft: String,
    origin: String,
    destination: String,
    departure_time: DateTime<Utc>,
    arrival_time: DateTime<Utc>,
    gate: Option<String>,
    status: String,
    capacity_first: i32,
    capacity_business: i32,
    capacity_economy: i32,
    price_first: i32,
    price_business: i32,
    price_economy: i32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<FlightRow> for Flight {
    type Error = StoreError;

    fn try_from(row: FlightRow) -> StoreResult<Self> {
        Ok(Flight {
            id: row.id,
            flight_number: row.flight_number,
            airline: row.airline,
            aircraft: row.aircraft,
            origin: row.origin,
            destination: row.destination,
            departure_time: row.departure_time,
            arrival_time: row.arrival_time,
            gate: row.gate,
            status: decode(FlightStatus::parse(&row.status))?,
            capacity: PerClass::new(
                seats(row.capacity_first),
                seats(row.capacity_business),
                seats(row.capacity_economy),
            ),
            price: PerClass::new(
                seats(row.price_first),
                seats(row.price_business),
                seats(row.price_economy),
            ),
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct PassengerRow {
    id: Uuid,
    name: String,
    email: String,
    phone: String,
    passport_number: String,
    date_of_birth: NaiveDate,
    nationality: String,
    user_id: Option<Uuid>,
    created_at: DateTime<Utc>,
}

impl From<PassengerRow> for Passenger {
    fn from(row: PassengerRow) -> Self {
        Passenger {
            id: row.id,
            name: row.name,
            email: Masked(row.email),
            phone: row.phone,
            passport_number: Masked(row.passport_number),
            date_of_birth: row.date_of_birth,
            nationality: row.nationality,
            user_id: row.user_id,
            created_at: row.created_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct BookingRow {
    id: Uuid,
    booking_reference: String,
    flight_id: Uuid,
    passenger_id: Uuid,
    seat_number: Option<String>,
    class: String,
    status: String,
    baggage: Json<Vec<Baggage>>,
    check_in_time: Option<DateTime<Utc>>,
    boarding_time: Option<DateTime<Utc>>,
    cancelled_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<BookingRow> for Booking {
    type Error = StoreError;

    fn try_from(row: BookingRow) -> StoreResult<Self> {
        Ok(Booking {
            id: row.id,
            booking_reference: row.booking_reference,
            flight_id: row.flight_id,
            passenger_id: row.passenger_id,
            seat_number: row.seat_number,
            class: decode(SeatClass::parse(&row.class))?,
            status: decode(BookingStatus::parse(&row.status))?,
            baggage: row.baggage.0,
            check_in_time: row.check_in_time,
            boarding_time: row.boarding_time,
            cancelled_at: row.cancelled_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct EntryRow {
    id: Uuid,
    booking_id: Uuid,
    flight_id: Uuid,
    passenger_id: Uuid,
    boarding_group: String,
    queue_position: i32,
    status: String,
    called_at: Option<DateTime<Utc>>,
    boarded_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<EntryRow> for BoardingQueueEntry {
    type Error = StoreError;

    fn try_from(row: EntryRow) -> StoreResult<Self> {
        Ok(BoardingQueueEntry {
            id: row.id,
            booking_id: row.booking_id,
            flight_id: row.flight_id,
            passenger_id: row.passenger_id,
            boarding_group: decode(BoardingGroup::parse(&row.boarding_group))?,
            queue_position: seats(row.queue_position),
            status: decode(QueueStatus::parse(&row.status))?,
            called_at: row.called_at,
            boarded_at: row.boarded_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct QueueViewRow {
    #[sqlx(flatten)]
    entry: EntryRow,
    booking_reference: String,
    seat_number: Option<String>,
    class: String,
    passenger_name: Option<String>,
    passport_number: Option<String>,
}

const FLIGHT_COLUMNS: &str = "id, flight_number, airline, aircraft, origin, destination, \
    departure_time, arrival_time, gate, status, capacity_first, capacity_business, \
    capacity_economy, price_first, price_business, price_economy, created_at, updated_at";

const BOOKING_COLUMNS: &str = "id, booking_reference, flight_id, passenger_id, seat_number, \
    class, status, baggage, check_in_time, boarding_time, cancelled_at, created_at, updated_at";

const ENTRY_COLUMNS: &str = "id, booking_id, flight_id, passenger_id, boarding_group, \
    queue_position, status, called_at, boarded_at, created_at, updated_at";

fn push_flight_filter(qb: &mut QueryBuilder<'_, Postgres>, filter: &FlightFilter) {
    if let Some(status) = filter.status {
        qb.push(" AND status = ").push_bind(status.as_str());
    }
    if let Some(destination) = &filter.destination {
        qb.push(" AND destination = ").push_bind(destination.to_ascii_uppercase());
    }
    if let Some(search) = &filter.search {
        let pattern = format!("%{}%", search.to_ascii_uppercase());
        qb.push(" AND (flight_number LIKE ")
            .push_bind(pattern.clone())
            .push(" OR origin LIKE ")
            .push_bind(pattern.clone())
            .push(" OR destination LIKE ")
            .push_bind(pattern)
            .push(")");
    }
}

fn push_booking_filter(qb: &mut QueryBuilder<'_, Postgres>, filter: &BookingFilter) {
    if let Some(status) = filter.status {
        qb.push(" AND status = ").push_bind(status.as_str());
    }
    if let Some(flight_id) = filter.flight_id {
        qb.push(" AND flight_id = ").push_bind(flight_id);
    }
    if let Some(passenger_id) = filter.passenger_id {
        qb.push(" AND passenger_id = ").push_bind(passenger_id);
    }
    if let Some(search) = &filter.search {
        qb.push(" AND booking_reference LIKE ")
            .push_bind(format!("%{}%", search.to_ascii_uppercase()));
    }
}

fn push_passenger_search(qb: &mut QueryBuilder<'_, Postgres>, search: Option<&str>) {
    if let Some(search) = search {
        let pattern = format!("%{}%", search);
        qb.push(" AND (name ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR email ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR passport_number ILIKE ")
            .push_bind(pattern)
            .push(")");
    }
}

fn push_page(qb: &mut QueryBuilder<'_, Postgres>, page: PageRequest) {
    qb.push(" LIMIT ")
        .push_bind(page.limit as i64)
        .push(" OFFSET ")
        .push_bind(page.offset() as i64);
}

// ============================================================================
// Flights
// ============================================================================

#[async_trait]
impl FlightRepository for PgStore {
    async fn insert_flight(&self, flight: &Flight) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO flights (id, flight_number, airline, aircraft, origin, destination,
                departure_time, arrival_time, gate, status,
                capacity_first, capacity_business, capacity_economy,
                price_first, price_business, price_economy, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18)
            "#,
        )
        .bind(flight.id)
        .bind(&flight.flight_number)
        .bind(&flight.airline)
        .bind(&flight.aircraft)
        .bind(&flight.origin)
        .bind(&flight.destination)
        .bind(flight.departure_time)
        .bind(flight.arrival_time)
        .bind(&flight.gate)
        .bind(flight.status.as_str())
        .bind(flight.capacity.first as i32)
        .bind(flight.capacity.business as i32)
        .bind(flight.capacity.economy as i32)
        .bind(flight.price.first as i32)
        .bind(flight.price.business as i32)
        .bind(flight.price.economy as i32)
        .bind(flight.created_at)
        .bind(flight.updated_at)
        .execute(&self.pool)
        .await
        .map_err(store_err)?;
        Ok(())
    }

    async fn get_flight(&self, id: Uuid) -> StoreResult<Option<Flight>> {
        let row: Option<FlightRow> =
            sqlx::query_as(&format!("SELECT {} FROM flights WHERE id = $1", FLIGHT_COLUMNS))
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .map_err(store_err)?;
        row.map(Flight::try_from).transpose()
    }

    async fn list_flights(&self, filter: &FlightFilter, page: PageRequest) -> StoreResult<Page<Flight>> {
        let mut count = QueryBuilder::new("SELECT COUNT(*) FROM flights WHERE TRUE");
        push_flight_filter(&mut count, filter);
        let total: i64 = count
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await
            .map_err(store_err)?;

        let mut select = QueryBuilder::new(format!("SELECT {} FROM flights WHERE TRUE", FLIGHT_COLUMNS));
        push_flight_filter(&mut select, filter);
        let column = match filter.sort_by {
            FlightSort::DepartureTime => "departure_time",
            FlightSort::ArrivalTime => "arrival_time",
            FlightSort::FlightNumber => "flight_number",
        };
        let direction = if filter.descending { "DESC" } else { "ASC" };
        select.push(format!(" ORDER BY {} {}, id {}", column, direction, direction));
        push_page(&mut select, page);

        let rows: Vec<FlightRow> = select
            .build_query_as()
            .fetch_all(&self.pool)
            .await
            .map_err(store_err)?;
        let items = rows.into_iter().map(Flight::try_from).collect::<StoreResult<Vec<_>>>()?;
        Ok(Page::assemble(items, total as usize, page))
    }

    async fn flights_at_gate(
        &self,
        gate: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> StoreResult<Vec<Flight>> {
        let rows: Vec<FlightRow> = sqlx::query_as(&format!(
            "SELECT {} FROM flights \
             WHERE gate = $1 AND status IN ('scheduled', 'boarding', 'delayed') \
             AND departure_time BETWEEN $2 AND $3",
            FLIGHT_COLUMNS
        ))
        .bind(gate)
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await
        .map_err(store_err)?;
        rows.into_iter().map(Flight::try_from).collect()
    }

    async fn gate_claims(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> StoreResult<Vec<Flight>> {
        let rows: Vec<FlightRow> = sqlx::query_as(&format!(
            "SELECT {} FROM flights \
             WHERE gate IS NOT NULL AND gate <> '' \
             AND status IN ('scheduled', 'boarding', 'delayed') \
             AND departure_time BETWEEN $1 AND $2",
            FLIGHT_COLUMNS
        ))
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await
        .map_err(store_err)?;
        rows.into_iter().map(Flight::try_from).collect()
    }

    async fn update_flight(&self, flight: &Flight) -> StoreResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE flights SET flight_number = $2, airline = $3, aircraft = $4, origin = $5,
                destination = $6, departure_time = $7, arrival_time = $8, gate = $9, status = $10,
                capacity_first = $11, capacity_business = $12, capacity_economy = $13,
                price_first = $14, price_business = $15, price_economy = $16, updated_at = $17
            WHERE id = $1
            "#,
        )
        .bind(flight.id)
        .bind(&flight.flight_number)
        .bind(&flight.airline)
        .bind(&flight.aircraft)
        .bind(&flight.origin)
        .bind(&flight.destination)
        .bind(flight.departure_time)
        .bind(flight.arrival_time)
        .bind(&flight.gate)
        .bind(flight.status.as_str())
        .bind(flight.capacity.first as i32)
        .bind(flight.capacity.business as i32)
        .bind(flight.capacity.economy as i32)
        .bind(flight.price.first as i32)
        .bind(flight.price.business as i32)
        .bind(flight.price.economy as i32)
        .bind(flight.updated_at)
        .execute(&self.pool)
        .await
        .map_err(store_err)?;
        expect_row(result.rows_affected(), "Flight")
    }

    async fn delete_flight(&self, id: Uuid) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM flights WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(store_err)?;
        expect_row(result.rows_affected(), "Flight")
    }
}

// ============================================================================
// Passengers
// ============================================================================

const PASSENGER_COLUMNS: &str =
    "id, name, email, phone, passport_number, date_of_birth, nationality, user_id, created_at";

#[async_trait]
impl PassengerRepository for PgStore {
    async fn insert_passenger(&self, passenger: &Passenger) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO passengers (id, name, email, phone, passport_number, date_of_birth,
                nationality, user_id, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(passenger.id)
        .bind(&passenger.name)
        .bind(passenger.email.expose())
        .bind(&passenger.phone)
        .bind(passenger.passport())
        .bind(passenger.date_of_birth)
        .bind(&passenger.nationality)
        .bind(passenger.user_id)
        .bind(passenger.created_at)
        .execute(&self.pool)
        .await
        .map_err(store_err)?;
        Ok(())
    }

    async fn get_passenger(&self, id: Uuid) -> StoreResult<Option<Passenger>> {
        let row: Option<PassengerRow> =
            sqlx::query_as(&format!("SELECT {} FROM passengers WHERE id = $1", PASSENGER_COLUMNS))
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .map_err(store_err)?;
        Ok(row.map(Passenger::from))
    }

    async fn find_passenger_by_passport(&self, passport: &str) -> StoreResult<Option<Passenger>> {
        let row: Option<PassengerRow> = sqlx::query_as(&format!(
            "SELECT {} FROM passengers WHERE passport_number = $1",
            PASSENGER_COLUMNS
        ))
        .bind(passport)
        .fetch_optional(&self.pool)
        .await
        .map_err(store_err)?;
        Ok(row.map(Passenger::from))
    }

    async fn list_passengers(
        &self,
        search: Option<&str>,
        page: PageRequest,
    ) -> StoreResult<Page<Passenger>> {
        let mut count = QueryBuilder::new("SELECT COUNT(*) FROM passengers WHERE TRUE");
        push_passenger_search(&mut count, search);
        let total: i64 = count
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await
            .map_err(store_err)?;

        let mut select =
            QueryBuilder::new(format!("SELECT {} FROM passengers WHERE TRUE", PASSENGER_COLUMNS));
        push_passenger_search(&mut select, search);
        select.push(" ORDER BY created_at DESC, id");
        push_page(&mut select, page);
        let rows: Vec<PassengerRow> = select
            .build_query_as()
            .fetch_all(&self.pool)
            .await
            .map_err(store_err)?;

        let items = rows.into_iter().map(Passenger::from).collect();
        Ok(Page::assemble(items, total as usize, page))
    }

    async fn update_passenger(&self, passenger: &Passenger) -> StoreResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE passengers SET name = $2, email = $3, phone = $4, passport_number = $5,
                date_of_birth = $6, nationality = $7, user_id = $8
            WHERE id = $1
            "#,
        )
        .bind(passenger.id)
        .bind(&passenger.name)
        .bind(passenger.email.expose())
        .bind(&passenger.phone)
        .bind(passenger.passport())
        .bind(passenger.date_of_birth)
        .bind(&passenger.nationality)
        .bind(passenger.user_id)
        .execute(&self.pool)
        .await
        .map_err(store_err)?;
        expect_row(result.rows_affected(), "Passenger")
    }

    async fn delete_passenger(&self, id: Uuid) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM passengers WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(store_err)?;
        expect_row(result.rows_affected(), "Passenger")
    }
}

// ============================================================================
// Bookings
// ============================================================================

#[async_trait]
impl BookingRepository for PgStore {
    async fn insert_booking(&self, booking: &Booking) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO bookings (id, booking_reference, flight_id, passenger_id, seat_number,
                class, status, baggage, check_in_time, boarding_time, cancelled_at,
                created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            "#,
        )
        .bind(booking.id)
        .bind(&booking.booking_reference)
        .bind(booking.flight_id)
        .bind(booking.passenger_id)
        .bind(&booking.seat_number)
        .bind(booking.class.as_str())
        .bind(booking.status.as_str())
        .bind(Json(&booking.baggage))
        .bind(booking.check_in_time)
        .bind(booking.boarding_time)
        .bind(booking.cancelled_at)
        .bind(booking.created_at)
        .bind(booking.updated_at)
        .execute(&self.pool)
        .await
        .map_err(store_err)?;
        Ok(())
    }

    async fn get_booking(&self, id: Uuid) -> StoreResult<Option<Booking>> {
        let row: Option<BookingRow> =
            sqlx::query_as(&format!("SELECT {} FROM bookings WHERE id = $1", BOOKING_COLUMNS))
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .map_err(store_err)?;
        row.map(Booking::try_from).transpose()
    }

    async fn find_booking_by_reference(&self, reference: &str) -> StoreResult<Option<Booking>> {
        let row: Option<BookingRow> = sqlx::query_as(&format!(
            "SELECT {} FROM bookings WHERE booking_reference = $1",
            BOOKING_COLUMNS
        ))
        .bind(reference)
        .fetch_optional(&self.pool)
        .await
        .map_err(store_err)?;
        row.map(Booking::try_from).transpose()
    }

    async fn booking_reference_exists(&self, reference: &str) -> StoreResult<bool> {
        sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM bookings WHERE booking_reference = $1)")
            .bind(reference)
            .fetch_one(&self.pool)
            .await
            .map_err(store_err)
    }

    async fn list_bookings(&self, filter: &BookingFilter, page: PageRequest) -> StoreResult<Page<Booking>> {
        let mut count = QueryBuilder::new("SELECT COUNT(*) FROM bookings WHERE TRUE");
        push_booking_filter(&mut count, filter);
        let total: i64 = count
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await
            .map_err(store_err)?;

        let mut select = QueryBuilder::new(format!("SELECT {} FROM bookings WHERE TRUE", BOOKING_COLUMNS));
        push_booking_filter(&mut select, filter);
        select.push(" ORDER BY created_at DESC, id");
        push_page(&mut select, page);
        let rows: Vec<BookingRow> = select
            .build_query_as()
            .fetch_all(&self.pool)
            .await
            .map_err(store_err)?;

        let items = rows.into_iter().map(Booking::try_from).collect::<StoreResult<Vec<_>>>()?;
        Ok(Page::assemble(items, total as usize, page))
    }

    async fn bookings_for_flight(&self, flight_id: Uuid) -> StoreResult<Vec<Booking>> {
        let rows: Vec<BookingRow> = sqlx::query_as(&format!(
            "SELECT {} FROM bookings WHERE flight_id = $1 ORDER BY created_at",
            BOOKING_COLUMNS
        ))
        .bind(flight_id)
        .fetch_all(&self.pool)
        .await
        .map_err(store_err)?;
        rows.into_iter().map(Booking::try_from).collect()
    }

    async fn count_bookings_for_flight(&self, flight_id: Uuid) -> StoreResult<usize> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM bookings WHERE flight_id = $1")
            .bind(flight_id)
            .fetch_one(&self.pool)
            .await
            .map_err(store_err)?;
        Ok(count as usize)
    }

    async fn count_bookings_for_passenger(&self, passenger_id: Uuid) -> StoreResult<usize> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM bookings WHERE passenger_id = $1")
            .bind(passenger_id)
            .fetch_one(&self.pool)
            .await
            .map_err(store_err)?;
        Ok(count as usize)
    }

    async fn update_booking(&self, booking: &Booking) -> StoreResult<()> {
        update_booking_row(&self.pool, booking).await
    }

    async fn cancel_booking(&self, booking: &Booking) -> StoreResult<Option<BoardingQueueEntry>> {
        let mut tx = self.pool.begin().await.map_err(store_err)?;
        update_booking_row(&mut *tx, booking).await?;
        let removed: Option<EntryRow> = sqlx::query_as(&format!(
            "DELETE FROM boarding_queue WHERE booking_id = $1 RETURNING {}",
            ENTRY_COLUMNS
        ))
        .bind(booking.id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(store_err)?;
        tx.commit().await.map_err(store_err)?;
        removed.map(BoardingQueueEntry::try_from).transpose()
    }
}

async fn update_booking_row<'e, E>(executor: E, booking: &Booking) -> StoreResult<()>
where
    E: sqlx::PgExecutor<'e>,
{
    let result = sqlx::query(
        r#"
        UPDATE bookings SET seat_number = $2, class = $3, status = $4, baggage = $5,
            check_in_time = $6, boarding_time = $7, cancelled_at = $8, updated_at = $9
        WHERE id = $1
        "#,
    )
    .bind(booking.id)
    .bind(&booking.seat_number)
    .bind(booking.class.as_str())
    .bind(booking.status.as_str())
    .bind(Json(&booking.baggage))
    .bind(booking.check_in_time)
    .bind(booking.boarding_time)
    .bind(booking.cancelled_at)
    .bind(booking.updated_at)
    .execute(executor)
    .await
    .map_err(store_err)?;
    expect_row(result.rows_affected(), "Booking")
}

async fn update_entry_row<'e, E>(executor: E, entry: &BoardingQueueEntry) -> StoreResult<()>
where
    E: sqlx::PgExecutor<'e>,
{
    let result = sqlx::query(
        r#"
        UPDATE boarding_queue SET status = $2, called_at = $3, boarded_at = $4, updated_at = $5
        WHERE id = $1
        "#,
    )
    .bind(entry.id)
    .bind(entry.status.as_str())
    .bind(entry.called_at)
    .bind(entry.boarded_at)
    .bind(entry.updated_at)
    .execute(executor)
    .await
    .map_err(store_err)?;
    expect_row(result.rows_affected(), "Queue entry")
}

// ============================================================================
// Boarding queue
// ============================================================================

#[async_trait]
impl BoardingRepository for PgStore {
    async fn insert_entry(&self, entry: &BoardingQueueEntry) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO boarding_queue (id, booking_id, flight_id, passenger_id, boarding_group,
                queue_position, status, called_at, boarded_at, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(entry.id)
        .bind(entry.booking_id)
        .bind(entry.flight_id)
        .bind(entry.passenger_id)
        .bind(entry.boarding_group.as_str())
        .bind(entry.queue_position as i32)
        .bind(entry.status.as_str())
        .bind(entry.called_at)
        .bind(entry.boarded_at)
        .bind(entry.created_at)
        .bind(entry.updated_at)
        .execute(&self.pool)
        .await
        .map_err(store_err)?;
        Ok(())
    }

    async fn get_entry(&self, id: Uuid) -> StoreResult<Option<BoardingQueueEntry>> {
        let row: Option<EntryRow> =
            sqlx::query_as(&format!("SELECT {} FROM boarding_queue WHERE id = $1", ENTRY_COLUMNS))
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .map_err(store_err)?;
        row.map(BoardingQueueEntry::try_from).transpose()
    }

    async fn find_entry_by_booking(&self, booking_id: Uuid) -> StoreResult<Option<BoardingQueueEntry>> {
        let row: Option<EntryRow> = sqlx::query_as(&format!(
            "SELECT {} FROM boarding_queue WHERE booking_id = $1",
            ENTRY_COLUMNS
        ))
        .bind(booking_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(store_err)?;
        row.map(BoardingQueueEntry::try_from).transpose()
    }

    async fn entries_for_flight(&self, flight_id: Uuid) -> StoreResult<Vec<BoardingQueueEntry>> {
        let rows: Vec<EntryRow> = sqlx::query_as(&format!(
            "SELECT {} FROM boarding_queue WHERE flight_id = $1",
            ENTRY_COLUMNS
        ))
        .bind(flight_id)
        .fetch_all(&self.pool)
        .await
        .map_err(store_err)?;
        let mut entries = rows
            .into_iter()
            .map(BoardingQueueEntry::try_from)
            .collect::<StoreResult<Vec<_>>>()?;
        entries.sort_by_key(|e| e.sort_key());
        Ok(entries)
    }

    async fn queue_view(&self, flight_id: Uuid) -> StoreResult<Vec<QueueEntryView>> {
        let rows: Vec<QueueViewRow> = sqlx::query_as(
            r#"
            SELECT q.id, q.booking_id, q.flight_id, q.passenger_id, q.boarding_group,
                q.queue_position, q.status, q.called_at, q.boarded_at, q.created_at, q.updated_at,
                b.booking_reference, b.seat_number, b.class,
                p.name AS passenger_name, p.passport_number
            FROM boarding_queue q
            JOIN bookings b ON b.id = q.booking_id
            LEFT JOIN passengers p ON p.id = q.passenger_id
            WHERE q.flight_id = $1
            "#,
        )
        .bind(flight_id)
        .fetch_all(&self.pool)
        .await
        .map_err(store_err)?;

        let mut views = Vec::with_capacity(rows.len());
        for row in rows {
            views.push(QueueEntryView {
                entry: BoardingQueueEntry::try_from(row.entry)?,
                booking_reference: row.booking_reference,
                seat_number: row.seat_number,
                class: decode(SeatClass::parse(&row.class))?,
                passenger_name: row.passenger_name,
                passport_number: row.passport_number.map(Masked),
            });
        }
        sort_queue(&mut views);
        Ok(views)
    }

    async fn update_entry(&self, entry: &BoardingQueueEntry) -> StoreResult<()> {
        update_entry_row(&self.pool, entry).await
    }

    async fn record_boarded(&self, entry: &BoardingQueueEntry, booking: &Booking) -> StoreResult<()> {
        let mut tx = self.pool.begin().await.map_err(store_err)?;
        update_entry_row(&mut *tx, entry).await?;
        update_booking_row(&mut *tx, booking).await?;
        tx.commit().await.map_err(store_err)
    }

    async fn delete_entry(&self, id: Uuid) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM boarding_queue WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(store_err)?;
        expect_row(result.rows_affected(), "Queue entry")
    }
}
