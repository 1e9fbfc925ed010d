use criterion::{Criterion, criterion_group, criterion_main};
use faer::rand::{Rng, SeedableRng, rngs::SmallRng};
use nd_access::{
    BadHandler, Buffer, NdArray, Order, OrderedShape, Requirements, Scalar, ScratchArrayImpl,
    Shape, Type, ndarrays,
};
use std::hint::black_box;

const DIMS: [i64; 3] = [64, 64, 32];

fn random_array(data_type: Type, order: Order) -> NdArray {
    let mut rng = SmallRng::seed_from_u64(1991);
    let shape = OrderedShape::new(Shape::from_dims(&DIMS).unwrap(), Some(order));
    let n = shape.num_pixels() as usize;
    let values: Vec<f64> = (0..n).map(|_| rng.random::<f64>() * 100.0).collect();
    let src = NdArray::new(
        ScratchArrayImpl::from_buffer(
            shape,
            Type::Float64.default_bad_handler(),
            Buffer::from(values),
        )
        .unwrap(),
    )
    .unwrap();
    let req = Requirements::new().with_data_type(data_type).unwrap();
    ndarrays::scratch_copy(&ndarrays::to_required_array(&src, &req).unwrap()).unwrap()
}

fn blank(data_type: Type, order: Order) -> NdArray {
    let shape = OrderedShape::new(Shape::from_dims(&DIMS).unwrap(), Some(order));
    NdArray::new(ScratchArrayImpl::new(shape, data_type).unwrap()).unwrap()
}

fn bench_copy(c: &mut Criterion, name: &str, src: &NdArray, dst: &NdArray) {
    c.bench_function(name, |b| {
        b.iter(|| ndarrays::copy(black_box(src), black_box(dst)).unwrap())
    });
}

fn copy_mapped(c: &mut Criterion) {
    let src = random_array(Type::Float32, Order::RowMajor);
    let dst = blank(Type::Float32, Order::RowMajor);
    bench_copy(c, "copy_mapped", &src, &dst);
}

fn copy_converting(c: &mut Criterion) {
    let src = random_array(Type::Int16, Order::RowMajor);
    let shape = OrderedShape::new(Shape::from_dims(&DIMS).unwrap(), Some(Order::RowMajor));
    let bad = BadHandler::new(Type::Int16, Some(Scalar::Int16(-1))).unwrap();
    let dst = NdArray::new(ScratchArrayImpl::with_bad_handler(shape, bad).unwrap()).unwrap();
    bench_copy(c, "copy_converting", &src, &dst);
}

fn copy_chunked(c: &mut Criterion) {
    let src = random_array(Type::Int32, Order::RowMajor);
    let view = ndarrays::to_required_array(
        &src,
        &Requirements::new().with_data_type(Type::Float32).unwrap(),
    )
    .unwrap();
    let dst = blank(Type::Float32, Order::RowMajor);
    bench_copy(c, "copy_chunked", &view, &dst);
}

fn copy_reordering(c: &mut Criterion) {
    let src = random_array(Type::Float32, Order::RowMajor);
    let dst = blank(Type::Float32, Order::ColumnMajor);
    bench_copy(c, "copy_reordering", &src, &dst);
}

fn windowed_read(c: &mut Criterion) {
    let src = random_array(Type::Float32, Order::RowMajor);
    let window = Shape::try_new(&[-10, 20, 5], &[80, 30, 40]).unwrap();
    let view = ndarrays::to_required_array(&src, &Requirements::new().with_window(window)).unwrap();
    let n = view.shape().num_pixels() as usize;
    let mut buf = Type::Float32.new_buffer(n);
    c.bench_function("windowed_read", |b| {
        b.iter(|| {
            let mut acc = view.access().unwrap();
            acc.read(&mut buf, 0, n).unwrap();
            black_box(&buf);
        })
    });
}

fn tile_read(c: &mut Criterion) {
    let src = random_array(Type::Int16, Order::ColumnMajor);
    let tile = Shape::try_new(&[8, 8, 8], &[32, 32, 32]).unwrap();
    let mut buf = Type::Int16.new_buffer(tile.num_pixels() as usize);
    c.bench_function("tile_read", |b| {
        b.iter(|| {
            let mut acc = src.access().unwrap();
            acc.read_tile(&mut buf, &tile).unwrap();
            black_box(&buf);
        })
    });
}

fn equality(c: &mut Criterion) {
    let a = random_array(Type::Float64, Order::RowMajor);
    let b = ndarrays::scratch_copy(&a).unwrap();
    c.bench_function("equals", |bench| {
        bench.iter(|| assert!(ndarrays::equals(black_box(&a), black_box(&b)).unwrap()))
    });
}

criterion_group!(
    arrays,
    copy_mapped,
    copy_converting,
    copy_chunked,
    copy_reordering,
    windowed_read,
    tile_read,
    equality
);
criterion_main!(arrays);
