//! OrderService commands feeding the listing views through the processor.

use std::sync::Arc;

use common::AggregateId;
use domain::{
    Aggregate, ApproveReturn, Caller, CartLine, Checkout, CustomerId, CustomerSnapshot,
    InMemoryCatalog, Money, OrderService, OrderStatus, ReturnStatus, SetStatus, SubmitReturn,
    TaxRate,
};
use event_store::{InMemoryEventStore, Inventory};
use projections::{OrderListView, ProjectionProcessor, ReadModel, ReturnQueueView};

async fn setup() -> (
    OrderService<InMemoryEventStore>,
    ProjectionProcessor<InMemoryEventStore>,
    OrderListView,
    ReturnQueueView,
) {
    let store = InMemoryEventStore::new();
    store.set_stock("BAG-01", 50).await.unwrap();
    let catalog = InMemoryCatalog::new();
    catalog
        .upsert_category("bags", TaxRate::from_percent(8).unwrap())
        .await;
    catalog
        .upsert_product("BAG-01", "Canvas tote", "bags", Money::new(120_000))
        .await;
    let service = OrderService::new(store.clone(), Arc::new(catalog));

    let orders = OrderListView::new();
    let returns = ReturnQueueView::new();
    let mut processor = ProjectionProcessor::new(store);
    processor.register(Box::new(orders.clone()));
    processor.register(Box::new(returns.clone()));

    (service, processor, orders, returns)
}

fn admin() -> Caller {
    Caller::Admin("ops".to_string())
}

async fn place(service: &OrderService<InMemoryEventStore>, customer_id: CustomerId) -> AggregateId {
    let cmd = Checkout::new(
        CustomerSnapshot::individual(customer_id, "Lan", "lan@example.com", "0902", "Can Tho"),
        vec![CartLine::new("BAG-01", 1)],
    );
    service
        .checkout(&Caller::Customer(customer_id), cmd)
        .await
        .unwrap()
        .aggregate
        .id()
        .unwrap()
}

#[tokio::test]
async fn listings_follow_the_order_lifecycle() {
    let (service, processor, orders, returns) = setup().await;
    let customer_id = CustomerId::new();
    let caller = Caller::Customer(customer_id);

    let kept = place(&service, customer_id).await;
    let returned = place(&service, customer_id).await;
    let other = place(&service, CustomerId::new()).await;

    for target in [OrderStatus::Paid, OrderStatus::Completed] {
        service
            .set_status(&admin(), SetStatus::new(returned, target))
            .await
            .unwrap();
    }
    service
        .set_status(&admin(), SetStatus::new(other, OrderStatus::Cancelled))
        .await
        .unwrap();
    service
        .submit_return(&caller, SubmitReturn::new(returned, "strap broke"))
        .await
        .unwrap();

    processor.run_catch_up().await.unwrap();

    let mine = orders.list_for_customer(customer_id, None).await;
    assert_eq!(mine.len(), 2);
    assert!(mine.iter().any(|o| o.order_id == kept));
    assert_eq!(orders.list(Some(OrderStatus::Cancelled)).await.len(), 1);
    assert_eq!(orders.count(), 3);

    let queue = returns.pending().await;
    assert_eq!(queue.len(), 1);
    assert_eq!(queue[0].order_id, returned);
    assert_eq!(queue[0].refund_amount, Money::new(129_600));

    service
        .approve_return(&admin(), ApproveReturn::new(returned))
        .await
        .unwrap();
    // Only the approval is new, once per view.
    assert_eq!(processor.run_catch_up().await.unwrap(), 2);

    assert!(returns.pending().await.is_empty());
    let row = orders.get_order(returned).await.unwrap();
    assert_eq!(row.return_status, ReturnStatus::Approved);
}

#[tokio::test]
async fn rebuild_reproduces_the_same_rows() {
    let (service, processor, orders, _) = setup().await;
    let customer_id = CustomerId::new();
    place(&service, customer_id).await;
    place(&service, customer_id).await;

    processor.run_catch_up().await.unwrap();
    let before = orders.list(None).await;

    processor.rebuild_all().await.unwrap();

    assert_eq!(orders.list(None).await, before);
}
