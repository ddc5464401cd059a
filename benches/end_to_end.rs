use criterion::{Criterion, criterion_group, criterion_main};
use lattice_sumcheck::proof::{SumCheckProver, parse_circuit, run_sumcheck, sample_hash_point};
use lattice_sumcheck::{Decryptor, Encoder, Encryptor, HeParameters, KeyGenerator, Scheme};
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;
use std::hint::black_box;

fn bench_he_pipeline(c: &mut Criterion) {
    let mut group = c.benchmark_group("he_pipeline");
    group.sample_size(10);

    let mut rng = ChaCha20Rng::seed_from_u64(123);
    let params = HeParameters::new(Scheme::Bfv)
        .set_poly_modulus(13)
        .unwrap()
        .set_coeff_modulus(&[30, 30, 40], &mut rng)
        .unwrap()
        .set_plain_modulus(18, &mut rng)
        .unwrap()
        .set_bound(1, 2)
        .generate_context()
        .unwrap();
    let keygen = KeyGenerator::new(&params).unwrap();
    let sk = keygen.generate_secret_key(&mut rng).unwrap();
    let pk = keygen.generate_public_key(&sk, &mut rng).unwrap();
    let encoder = Encoder::new(&params).unwrap();
    let encryptor = Encryptor::new(&params, &pk).unwrap();
    let decryptor = Decryptor::new(&params, &sk).unwrap();

    let m1 = encoder.coeff_encode(&[1, 2, 3]).unwrap();
    let m2 = encoder.coeff_encode(&[4, 5]).unwrap();

    group.bench_function("keygen_8192", |b| {
        b.iter(|| {
            let sk = keygen.generate_secret_key(&mut rng).unwrap();
            black_box(keygen.generate_public_key(&sk, &mut rng).unwrap())
        });
    });
    group.bench_function("encrypt_8192", |b| {
        b.iter(|| black_box(encryptor.encrypt(black_box(&m1)).unwrap()));
    });

    let c1 = encryptor.encrypt(&m1).unwrap();
    let c2 = encryptor.encrypt(&m2).unwrap();
    group.bench_function("c1_c2_c2_8192", |b| {
        b.iter(|| black_box(c1.mul(&c2).unwrap().mul(&c2).unwrap()));
    });

    let product = c1.mul(&c2).unwrap().mul(&c2).unwrap();
    group.bench_function("decrypt_size4_8192", |b| {
        b.iter(|| black_box(decryptor.decrypt(black_box(&product)).unwrap()));
    });

    group.finish();
}

fn bench_sumcheck(c: &mut Criterion) {
    let mut group = c.benchmark_group("sumcheck");
    group.sample_size(10);

    let mut rng = ChaCha20Rng::seed_from_u64(321);
    let params = HeParameters::new(Scheme::Bv)
        .set_poly_modulus(10)
        .unwrap()
        .set_coeff_modulus(&[30, 30, 40], &mut rng)
        .unwrap()
        .set_plain_modulus(16, &mut rng)
        .unwrap()
        .set_bound(1, 2)
        .generate_context()
        .unwrap();
    let keygen = KeyGenerator::new(&params).unwrap();
    let sk = keygen.generate_secret_key(&mut rng).unwrap();
    let pk = keygen.generate_public_key(&sk, &mut rng).unwrap();
    let encoder = Encoder::new(&params).unwrap();
    let encryptor = Encryptor::new(&params, &pk).unwrap();
    let hash_point = sample_hash_point(params.context().unwrap(), &mut rng).unwrap();

    let circuit = parse_circuit("0*1+2*3+4*5+6*7").unwrap();
    let inputs: Vec<_> = (1..=8)
        .map(|v| encryptor.encrypt(&encoder.coeff_encode(&[v]).unwrap()).unwrap())
        .collect();
    let layer = &circuit.layers()[circuit.layer_index(0)];

    group.bench_function("prove_and_verify_bottom_layer_1024", |b| {
        b.iter(|| {
            let mut prover =
                SumCheckProver::from_ciphertexts(layer, &inputs, None, hash_point.point())
                    .unwrap();
            let claim = prover.initial_claim().unwrap();
            black_box(
                run_sumcheck(&mut prover, claim, hash_point.sub_modulus(), &mut rng).unwrap(),
            )
        });
    });

    group.finish();
}

criterion_group!(benches, bench_he_pipeline, bench_sumcheck);
criterion_main!(benches);
